//! Test helpers shared by the integration tests.

use kusanagi_kernel::codec;
use kusanagi_kernel::payload::command::{CommandArgs, CommandPayload};
use kusanagi_kernel::payload::meta::TransportMeta;
use kusanagi_kernel::schema::{SchemaRegistry, ServiceSchema};
use kusanagi_kernel::transport::Transport;
use kusanagi_runtime::server::{Server, ServerConfig, RequestProcessor};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const GATEWAY_INTERNAL: &str = "ktp://10.0.0.1:77";
pub const GATEWAY_PUBLIC: &str = "http://10.0.0.1:80";

/// A transport seeded with the test gateway pair.
pub fn transport() -> Transport {
    Transport::with_meta(TransportMeta {
        gateway: vec![GATEWAY_INTERNAL.to_string(), GATEWAY_PUBLIC.to_string()],
        ..TransportMeta::default()
    })
}

/// A service command for an action, carrying a seeded transport.
pub fn action_command(action: &str) -> CommandPayload {
    CommandPayload::new(
        &format!("test.{action}"),
        "service",
        CommandArgs {
            action: Some(action.to_string()),
            transport: Some(transport()),
            ..CommandArgs::default()
        },
    )
}

/// MsgPack encoded schema mappings for a single service version.
pub fn mappings(service: &str, version: &str) -> Vec<u8> {
    let mut versions = BTreeMap::new();
    versions.insert(version.to_string(), ServiceSchema::default());
    let mut mappings = BTreeMap::new();
    mappings.insert(service.to_string(), versions);
    codec::pack(&mappings).expect("schema mappings must encode")
}

/// A component server running on its own thread until the guard drops.
pub struct TestServer {
    pub address: String,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a server for `processor` on a local TCP port.
    pub fn start<P: RequestProcessor>(port: u16, timeout_ms: u64, processor: P) -> Self {
        let address = format!("tcp://127.0.0.1:{port}");
        let config = ServerConfig {
            address: address.clone(),
            name: "test".to_string(),
            version: "1.0.0".to_string(),
            timeout_ms,
        };
        let shutdown = CancellationToken::new();
        let server_shutdown = shutdown.clone();
        let handle = std::thread::spawn(move || {
            let server = Server::new(config, SchemaRegistry::new(), Arc::new(processor));
            server
                .run_with_shutdown(server_shutdown)
                .expect("test server must run");
        });
        // Give the reactor a moment to bind before clients connect.
        std::thread::sleep(std::time::Duration::from_millis(100));
        Self {
            address,
            shutdown,
            handle: Some(handle),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A gateway-side client speaking the component wire protocol.
pub struct TestGateway {
    socket: zmq::Socket,
    // Keep the context alive for the socket's lifetime.
    _context: zmq::Context,
}

impl TestGateway {
    pub fn connect(address: &str) -> Self {
        let context = zmq::Context::new();
        let socket = context.socket(zmq::DEALER).expect("dealer socket");
        socket.set_linger(0).expect("linger");
        socket.connect(address).expect("connect");
        Self {
            socket,
            _context: context,
        }
    }

    /// Send a `[rid, action, schemas, payload]` request.
    pub fn send(&self, rid: &[u8], action: &str, schemas: &[u8], payload: &[u8]) {
        self.socket
            .send_multipart(
                [
                    rid.to_vec(),
                    action.as_bytes().to_vec(),
                    schemas.to_vec(),
                    payload.to_vec(),
                ],
                0,
            )
            .expect("send request");
    }

    /// Send arbitrary frames, for malformed-message tests.
    pub fn send_raw(&self, frames: &[Vec<u8>]) -> Result<(), zmq::Error> {
        self.socket.send_multipart(frames.iter().cloned(), 0)
    }

    /// Receive a `[rid, flags, reply]` response within `timeout_ms`.
    pub fn recv(&self, timeout_ms: i64) -> Option<Vec<Vec<u8>>> {
        let readable = self
            .socket
            .poll(zmq::POLLIN, timeout_ms)
            .expect("poll response");
        if readable == 0 {
            return None;
        }
        Some(self.socket.recv_multipart(0).expect("receive response"))
    }
}
