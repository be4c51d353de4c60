use kusanagi_kernel::codec;
use kusanagi_kernel::payload::command::{CommandArgs, CommandPayload};
use kusanagi_kernel::payload::file::File;
use kusanagi_kernel::payload::param::Param;
use kusanagi_kernel::payload::reply::ReplyPayload;
use kusanagi_kernel::transport::Call;
use kusanagi_runtime::server::{RequestContext, RequestProcessor};
use kusanagi_testing::{GATEWAY_PUBLIC, TestGateway, TestServer, action_command, mappings};
use serde_json::json;

/// Answers every request with an entity under the public gateway address.
struct EchoProcessor;

impl RequestProcessor for EchoProcessor {
    fn process(&self, context: RequestContext) -> ReplyPayload {
        let mut reply = ReplyPayload::for_action(&context.command);
        if let Some(transport) = reply
            .result_mut()
            .and_then(|result| result.transport.as_mut())
        {
            transport.set_data("test", "1.0.0", &context.action, json!({"hello": "world"}));
        }
        reply
    }
}

/// Answers with the schema snapshot contents as the return value.
struct ServicesProcessor;

impl RequestProcessor for ServicesProcessor {
    fn process(&self, context: RequestContext) -> ReplyPayload {
        let services = context.schemas.services();
        let mut reply = ReplyPayload::for_action(&context.command);
        if let Some(result) = reply.result_mut() {
            result.return_value = Some(serde_json::to_value(&services).expect("services"));
        }
        reply
    }
}

/// Simulates a slow userland callback.
struct SleepyProcessor;

impl RequestProcessor for SleepyProcessor {
    fn process(&self, context: RequestContext) -> ReplyPayload {
        std::thread::sleep(std::time::Duration::from_millis(500));
        ReplyPayload::for_action(&context.command)
    }
}

/// Registers a download and a deferred call with files.
struct DownloadProcessor;

impl RequestProcessor for DownloadProcessor {
    fn process(&self, context: RequestContext) -> ReplyPayload {
        let mut reply = ReplyPayload::for_action(&context.command);
        if let Some(transport) = reply
            .result_mut()
            .and_then(|result| result.transport.as_mut())
        {
            transport.set_download(File::new("report", "", "text/plain"));
            transport.set_defer_call(
                "test",
                "1.0.0",
                Call {
                    name: "uploads".into(),
                    version: "1.0.0".into(),
                    action: "store".into(),
                    files: Some(vec![File::new("doc", "", "")]),
                    ..Call::default()
                },
            );
        }
        reply
    }
}

fn encoded(command: &CommandPayload) -> Vec<u8> {
    codec::pack(command).expect("command must encode")
}

#[test]
fn test_round_trip_echoes_request_id() {
    let server = TestServer::start(59801, 5_000, EchoProcessor);
    let gateway = TestGateway::connect(&server.address);

    gateway.send(b"rid-1", "read", b"", &encoded(&action_command("read")));
    let frames = gateway.recv(5_000).expect("a reply within the timeout");

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0], b"rid-1");
    assert_eq!(frames[1], vec![0x00]);

    let reply: ReplyPayload = codec::unpack(&frames[2]).expect("reply must decode");
    let transport = reply.result().unwrap().transport.as_ref().unwrap();
    let items = &transport.data.as_ref().unwrap()[GATEWAY_PUBLIC]["test"]["1.0.0"]["read"];
    assert_eq!(items[0], json!({"hello": "world"}));
}

#[test]
fn test_schema_update_is_visible_to_later_requests() {
    let server = TestServer::start(59802, 5_000, ServicesProcessor);
    let gateway = TestGateway::connect(&server.address);

    // First request ships mappings for foo 1.0.0; an empty schemas frame
    // afterwards means no update.
    gateway.send(
        b"rid-1",
        "read",
        &mappings("foo", "1.0.0"),
        &encoded(&action_command("read")),
    );
    let frames = gateway.recv(5_000).expect("first reply");
    let reply: ReplyPayload = codec::unpack(&frames[2]).unwrap();
    assert_eq!(
        reply.result().unwrap().return_value,
        Some(json!([{"name": "foo", "version": "1.0.0"}]))
    );

    gateway.send(b"rid-2", "read", b"", &encoded(&action_command("read")));
    let frames = gateway.recv(5_000).expect("second reply");
    let reply: ReplyPayload = codec::unpack(&frames[2]).unwrap();
    assert_eq!(
        reply.result().unwrap().return_value,
        Some(json!([{"name": "foo", "version": "1.0.0"}]))
    );
}

#[test]
fn test_execution_timeout_emits_no_reply() {
    let server = TestServer::start(59803, 100, SleepyProcessor);
    let gateway = TestGateway::connect(&server.address);

    gateway.send(b"rid-1", "read", b"", &encoded(&action_command("read")));
    assert!(gateway.recv(1_000).is_none());
}

#[test]
fn test_response_flags_in_ascending_order() {
    let server = TestServer::start(59804, 5_000, DownloadProcessor);
    let gateway = TestGateway::connect(&server.address);

    gateway.send(b"rid-1", "read", b"", &encoded(&action_command("read")));
    let frames = gateway.recv(5_000).expect("a reply");
    assert_eq!(frames[1], vec![0x01, 0x02, 0x04]);
}

#[test]
fn test_undecodable_payload_yields_internal_server_error() {
    let server = TestServer::start(59805, 5_000, EchoProcessor);
    let gateway = TestGateway::connect(&server.address);

    gateway.send(b"rid-1", "read", b"", b"\xc1\xc1\xc1");
    let frames = gateway.recv(5_000).expect("an error reply");

    assert_eq!(frames[1], vec![0x00]);
    let reply: ReplyPayload = codec::unpack(&frames[2]).unwrap();
    assert_eq!(reply.error.unwrap().message, "Internal Server Error");
}

#[test]
fn test_short_messages_are_dropped_and_server_survives() {
    let server = TestServer::start(59806, 5_000, EchoProcessor);
    let gateway = TestGateway::connect(&server.address);

    // Too few frames: logged as critical and discarded.
    gateway
        .send_raw(&[b"rid-0".to_vec(), b"read".to_vec()])
        .expect("send short message");
    assert!(gateway.recv(300).is_none());

    // The reactor keeps serving afterwards.
    gateway.send(b"rid-1", "read", b"", &encoded(&action_command("read")));
    assert!(gateway.recv(5_000).is_some());
}

#[test]
fn test_frames_beyond_the_prefix_are_discarded() {
    let server = TestServer::start(59807, 5_000, EchoProcessor);
    let gateway = TestGateway::connect(&server.address);

    gateway
        .send_raw(&[
            b"rid-1".to_vec(),
            b"read".to_vec(),
            Vec::new(),
            encoded(&action_command("read")),
            b"extra".to_vec(),
        ])
        .expect("send long message");

    let frames = gateway.recv(5_000).expect("a reply");
    assert_eq!(frames[0], b"rid-1");
}

#[test]
fn test_command_payload_round_trip_over_wire_codec() {
    let mut command = action_command("read");
    command.command.args.params = Some(vec![
        Param::new("id", json!(42)),
        Param::new("weight", json!(1.5)),
        Param::new("name", json!("jane")),
    ]);
    command.command.args.files = Some(vec![File::new("avatar", "", "image/png")]);

    let bytes = encoded(&command);
    let restored: CommandPayload = codec::unpack(&bytes).expect("decode");
    assert_eq!(restored, command);

    let empty = CommandPayload::new("bare", "service", CommandArgs::default());
    let restored: CommandPayload = codec::unpack(&encoded(&empty)).expect("decode");
    assert_eq!(restored, empty);
}
