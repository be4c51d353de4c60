//! Single-shot stdin invocation.
//!
//! With `--action NAME` the component does not bind any socket: it reads
//! one JSON encoded command from stdin, runs the normal processor and
//! prints the reply as pretty JSON on stdout.

use crate::error::RuntimeResult;
use crate::server::{RequestContext, RequestProcessor};
use kusanagi_kernel::codec;
use kusanagi_kernel::payload::command::CommandPayload;
use kusanagi_kernel::schema::SchemaSnapshot;
use std::io::Read;
use tokio_util::sync::CancellationToken;

pub fn run_stdin_action<P: RequestProcessor>(
    processor: &P,
    action: &str,
    timeout_ms: u64,
) -> RuntimeResult<String> {
    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;
    process_text(processor, action, timeout_ms, &text)
}

/// Process a JSON command text and render the reply as pretty JSON.
pub fn process_text<P: RequestProcessor>(
    processor: &P,
    action: &str,
    timeout_ms: u64,
    text: &str,
) -> RuntimeResult<String> {
    let command: CommandPayload = codec::from_json(text)?;
    let context = RequestContext {
        rid: b"stdin".to_vec(),
        action: action.to_string(),
        command,
        schemas: SchemaSnapshot::default(),
        cancel: CancellationToken::new(),
        timeout_ms,
    };
    let reply = processor.process(context);
    Ok(codec::to_json_pretty(&reply)?)
}
