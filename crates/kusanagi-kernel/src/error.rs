//! Crate-level error type for `kusanagi-kernel`.
//!
//! Wraps each sub-module's typed error via `#[from]` so that the `?`
//! operator converts them automatically.

use crate::codec::CodecError;
use crate::payload::file::FileError;
use crate::schema::SchemaError;
use crate::transport::TransportError;
use thiserror::Error;

/// Crate-level error type for `kusanagi-kernel`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum KernelError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

/// Convenience result alias.
pub type KernelResult<T> = Result<T, KernelError>;
