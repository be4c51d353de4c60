//! Per-request state.

use kusanagi_kernel::payload::command::CommandPayload;
use kusanagi_kernel::payload::reply::ReplyPayload;
use kusanagi_kernel::schema::SchemaSnapshot;
use tokio_util::sync::CancellationToken;

/// Everything a processor needs to handle one request.
///
/// The context is owned by exactly one processor task for the lifetime of
/// the request; nothing in it is shared with other in-flight requests
/// apart from the immutable schema snapshot.
pub struct RequestContext {
    /// Request id assigned by the gateway; echoed back on the reply.
    pub rid: Vec<u8>,

    /// The action or middleware stage named in the request frame.
    pub action: String,

    pub command: CommandPayload,

    /// Schema mappings pinned at dispatch time.
    pub schemas: SchemaSnapshot,

    /// Fires when the request times out or the server shuts down.
    pub cancel: CancellationToken,

    pub timeout_ms: u64,
}

impl RequestContext {
    /// Printable request id for log lines.
    pub fn rid_display(&self) -> String {
        String::from_utf8_lossy(&self.rid).into_owned()
    }
}

/// Flag bytes indicating which transport features a reply carries.
///
/// One byte per feature, concatenated in ascending order; a reply that
/// touches none of them carries the single `0x00` byte.
pub fn response_flags(reply: &ReplyPayload, service: &str, version: &str) -> Vec<u8> {
    let mut flags = Vec::new();
    if let Some(transport) = reply.result().and_then(|result| result.transport.as_ref()) {
        if transport.has_calls(service, version) {
            flags.push(0x01);
        }
        if transport.has_files() {
            flags.push(0x02);
        }
        if transport.has_transactions() {
            flags.push(0x03);
        }
        if transport.has_download() {
            flags.push(0x04);
        }
    }
    if flags.is_empty() {
        flags.push(0x00);
    }
    flags
}
