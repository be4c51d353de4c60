//! Component server and request dispatcher.
//!
//! The reactor thread owns a ROUTER socket for gateway traffic and an
//! inproc PAIR that aggregates processor output. Requests arrive as
//! `[rid, action, schemas, payload]` multipart messages (behind the
//! routing identity the ROUTER prepends); each one is handed to its own
//! task with a timeout derived from the CLI input, so the reactor never
//! blocks on processing. Responses flow back as `[rid, flags, reply]`.

pub mod state;
pub mod stdio;

pub use state::{RequestContext, response_flags};

use crate::error::{ServerError, ServerResult};
use kusanagi_kernel::codec;
use kusanagi_kernel::payload::command::CommandPayload;
use kusanagi_kernel::payload::reply::{DEFAULT_ERROR_STATUS, ReplyPayload};
use kusanagi_kernel::schema::SchemaRegistry;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const RESPONSES_ENDPOINT: &str = "inproc://kusanagi-responses";

/// Reactor poll interval; bounds shutdown latency.
const POLL_INTERVAL_MS: i64 = 250;

/// Userland-facing processor driven by the server.
///
/// Implementations run on blocking worker threads, one task per in-flight
/// request, and own their context for the whole request lifetime.
pub trait RequestProcessor: Send + Sync + 'static {
    fn process(&self, context: RequestContext) -> ReplyPayload;
}

/// Static configuration for a server instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// ZMQ bind address.
    pub address: String,

    /// Component name; used for the pending-calls response flag.
    pub name: String,

    /// Component version.
    pub version: String,

    /// Per-request execution timeout in milliseconds.
    pub timeout_ms: u64,
}

/// The ZMQ component server.
pub struct Server<P: RequestProcessor> {
    config: ServerConfig,
    registry: SchemaRegistry,
    processor: Arc<P>,
}

impl<P: RequestProcessor> Server<P> {
    pub fn new(config: ServerConfig, registry: SchemaRegistry, processor: Arc<P>) -> Self {
        Self {
            config,
            registry,
            processor,
        }
    }

    /// Bind the sockets and process requests until a termination signal.
    pub fn run(&self) -> ServerResult<()> {
        self.run_with_shutdown(CancellationToken::new())
    }

    /// Like [`Server::run`], stopping also when `shutdown` is cancelled.
    pub fn run_with_shutdown(&self, shutdown: CancellationToken) -> ServerResult<()> {
        // Panics inside processors are recovered by the dispatcher; the
        // hook logs them with a stack from the panicking thread.
        std::panic::set_hook(Box::new(|info| {
            let backtrace = std::backtrace::Backtrace::force_capture();
            error!("Request processor panic: {info}\n{backtrace}");
        }));

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.spawn(wait_for_termination(shutdown.clone()));

        let context = zmq::Context::new();
        let router = context.socket(zmq::ROUTER)?;
        // Unlimited receive high-water-mark: never drop requests under bursts.
        router.set_rcvhwm(0)?;
        router.set_linger(0)?;
        router.bind(&self.config.address)?;

        let collector = context.socket(zmq::PAIR)?;
        collector.set_linger(0)?;
        collector.bind(RESPONSES_ENDPOINT)?;

        let (sender, receiver) = flume::unbounded::<Vec<Vec<u8>>>();
        let forwarder = {
            let context = context.clone();
            std::thread::spawn(move || forward_responses(&context, &receiver))
        };

        info!(
            "Component server listening on {} (timeout {}ms)",
            self.config.address, self.config.timeout_ms
        );

        let result = self.reactor(runtime.handle(), &router, &collector, &sender, &shutdown);

        shutdown.cancel();
        drop(sender);
        runtime.shutdown_timeout(Duration::from_secs(1));
        if forwarder.join().is_err() {
            error!("Response forwarder thread panicked");
        }
        info!("Component server stopped");
        result
    }

    fn reactor(
        &self,
        handle: &tokio::runtime::Handle,
        router: &zmq::Socket,
        collector: &zmq::Socket,
        sender: &flume::Sender<Vec<Vec<u8>>>,
        shutdown: &CancellationToken,
    ) -> ServerResult<()> {
        loop {
            if shutdown.is_cancelled() {
                return Ok(());
            }

            let (router_ready, collector_ready) = {
                let mut items = [
                    router.as_poll_item(zmq::POLLIN),
                    collector.as_poll_item(zmq::POLLIN),
                ];
                match zmq::poll(&mut items, POLL_INTERVAL_MS) {
                    Ok(0) => continue,
                    Ok(_) => (items[0].is_readable(), items[1].is_readable()),
                    Err(zmq::Error::EINTR) => continue,
                    Err(err) => return Err(err.into()),
                }
            };

            if collector_ready {
                let frames = collector.recv_multipart(0)?;
                router.send_multipart(frames, 0)?;
            }
            if router_ready {
                let frames = router.recv_multipart(0)?;
                self.dispatch(handle, frames, sender, shutdown);
            }
        }
    }

    /// Validate a request and hand it to its own processor task.
    fn dispatch(
        &self,
        handle: &tokio::runtime::Handle,
        frames: Vec<Vec<u8>>,
        sender: &flume::Sender<Vec<Vec<u8>>>,
        shutdown: &CancellationToken,
    ) {
        // Frame 0 is the routing identity; frames beyond the request
        // prefix are discarded.
        let mut frames = frames.into_iter();
        let (Some(identity), Some(rid), Some(action), Some(schemas), Some(payload)) = (
            frames.next(),
            frames.next(),
            frames.next(),
            frames.next(),
            frames.next(),
        ) else {
            error!("Received invalid multipart message: too few frames");
            return;
        };

        // An empty schemas frame means no update.
        if !schemas.is_empty() {
            match self.registry.update(&schemas) {
                Ok(()) => info!("Schema mappings updated"),
                Err(err) => error!("Failed to update schema mappings: {err}"),
            }
        }

        let command: CommandPayload = match codec::unpack(&payload) {
            Ok(command) => command,
            Err(err) => {
                error!("Failed to decode command payload: {err}");
                let reply = ReplyPayload::new_error("Internal Server Error", 0, DEFAULT_ERROR_STATUS);
                match codec::pack(&reply) {
                    Ok(bytes) => {
                        let _ = sender.send(vec![identity, rid, vec![0x00], bytes]);
                    }
                    Err(err) => error!("Failed to encode error reply: {err}"),
                }
                return;
            }
        };

        let context = RequestContext {
            rid: rid.clone(),
            action: String::from_utf8_lossy(&action).into_owned(),
            command,
            schemas: self.registry.snapshot(),
            cancel: shutdown.child_token(),
            timeout_ms: self.config.timeout_ms,
        };

        let processor = self.processor.clone();
        let sender = sender.clone();
        let service = self.config.name.clone();
        let version = self.config.version.clone();

        handle.spawn(async move {
            let rid_display = context.rid_display();
            let cancel = context.cancel.clone();
            let timeout = Duration::from_millis(context.timeout_ms);

            let worker = tokio::task::spawn_blocking(move || {
                std::panic::catch_unwind(AssertUnwindSafe(|| processor.process(context)))
            });

            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    // The gateway owns its client-side timeout; no reply
                    // frame is emitted for an expired request.
                    warn!(
                        "Execution timed out after {}ms for request {rid_display}",
                        timeout.as_millis()
                    );
                    cancel.cancel();
                }
                outcome = worker => {
                    let reply = match outcome {
                        Ok(Ok(reply)) => reply,
                        Ok(Err(_)) | Err(_) => {
                            ReplyPayload::new_error("Internal Server Error", 0, DEFAULT_ERROR_STATUS)
                        }
                    };
                    let flags = response_flags(&reply, &service, &version);
                    match codec::pack(&reply) {
                        Ok(bytes) => {
                            let _ = sender.send(vec![identity, rid, flags, bytes]);
                        }
                        Err(err) => error!("Failed to encode reply for request {rid_display}: {err}"),
                    }
                }
            }
        });
    }
}

/// Bridge processor output onto the reactor's inproc PAIR.
fn forward_responses(context: &zmq::Context, receiver: &flume::Receiver<Vec<Vec<u8>>>) {
    let socket = match context.socket(zmq::PAIR) {
        Ok(socket) => socket,
        Err(err) => {
            error!("Failed to open response socket: {err}");
            return;
        }
    };
    if let Err(err) = socket.set_linger(0) {
        error!("Failed to configure response socket: {err}");
        return;
    }
    if let Err(err) = socket.connect(RESPONSES_ENDPOINT) {
        error!("Failed to connect response socket: {err}");
        return;
    }

    while let Ok(frames) = receiver.recv() {
        if let Err(err) = socket.send_multipart(frames, 0) {
            error!("Failed to forward response: {err}");
        }
    }
}

/// Resolve on SIGHUP, SIGINT, SIGQUIT or SIGTERM and trigger shutdown.
async fn wait_for_termination(shutdown: CancellationToken) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(err) => {
            error!("Failed to install signal handler: {err}");
            return;
        }
    };
    let mut interrupt = match signal(SignalKind::interrupt()) {
        Ok(stream) => stream,
        Err(err) => {
            error!("Failed to install signal handler: {err}");
            return;
        }
    };
    let mut quit = match signal(SignalKind::quit()) {
        Ok(stream) => stream,
        Err(err) => {
            error!("Failed to install signal handler: {err}");
            return;
        }
    };
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            error!("Failed to install signal handler: {err}");
            return;
        }
    };

    tokio::select! {
        _ = hangup.recv() => {}
        _ = interrupt.recv() => {}
        _ = quit.recv() => {}
        _ = terminate.recv() => {}
    }
    info!("Termination signal received");
    shutdown.cancel();
}
