//! Crate-level error types for `kusanagi-runtime`.

use crate::call::CallError;
use kusanagi_kernel::KernelError;
use kusanagi_kernel::codec::CodecError;
use thiserror::Error;

/// Errors raised by the component server.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ServerError {
    #[error("ZMQ error: {0}")]
    Zmq(#[from] zmq::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Crate-level error type for `kusanagi-runtime`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RuntimeError {
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("Call error: {0}")]
    Call(#[from] CallError),

    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience result alias.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
