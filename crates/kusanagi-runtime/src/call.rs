//! Run-time call client.
//!
//! A run-time call is a synchronous round-trip to another action mediated
//! by the gateway. The client opens a single-shot REQ socket against the
//! component's own bind address (the gateway provides the forwarding
//! path), frames the payload as `[0x01, payload]` and waits for the reply
//! under the call timeout. Each call uses a fresh ZMQ context so an
//! aborted request cannot leak sockets into the server context.

use kusanagi_kernel::codec::CodecError;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

const CALL_FLAG: &[u8] = b"\x01";

/// Slice used to poll the reply socket so cancellation stays responsive.
const POLL_SLICE_MS: u64 = 100;

/// Errors raised by the run-time call client.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CallError {
    #[error("Run-time call timed out after {0}ms")]
    Timeout(u64),

    #[error("Run-time call cancelled")]
    Cancelled,

    #[error("Run-time call transport failure: {0}")]
    Transport(String),

    /// The remote action failed; the message is preserved verbatim.
    #[error("{0}")]
    Remote(String),

    #[error("Run-time call payload error: {0}")]
    Codec(#[from] CodecError),
}

impl From<zmq::Error> for CallError {
    fn from(err: zmq::Error) -> Self {
        CallError::Transport(err.to_string())
    }
}

/// Result type for run-time call operations.
pub type CallResult<T> = Result<T, CallError>;

/// Execute a run-time call round-trip.
///
/// Returns the raw reply payload and the measured duration in
/// milliseconds (at least 1 for a completed round-trip).
pub fn execute(
    address: &str,
    request: &[u8],
    timeout_ms: u64,
    cancel: &CancellationToken,
) -> CallResult<(Vec<u8>, u64)> {
    let context = zmq::Context::new();
    let socket = context.socket(zmq::REQ)?;
    socket.set_linger(0)?;
    socket.connect(address)?;

    let started = Instant::now();
    socket.send_multipart([CALL_FLAG.to_vec(), request.to_vec()], 0)?;

    loop {
        if cancel.is_cancelled() {
            return Err(CallError::Cancelled);
        }
        let elapsed = started.elapsed().as_millis() as u64;
        if elapsed >= timeout_ms {
            return Err(CallError::Timeout(timeout_ms));
        }
        let wait = POLL_SLICE_MS.min(timeout_ms - elapsed);
        if socket.poll(zmq::POLLIN, wait as i64)? > 0 {
            let frames = socket.recv_multipart(0)?;
            let duration = (started.elapsed().as_millis() as u64).max(1);
            let reply = frames
                .into_iter()
                .next_back()
                .ok_or_else(|| CallError::Transport("empty reply".to_string()))?;
            return Ok((reply, duration));
        }
    }
}
