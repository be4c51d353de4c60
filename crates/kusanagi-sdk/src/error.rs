//! Typed errors surfaced to userland callbacks.

use kusanagi_kernel::codec::CodecError;
use kusanagi_kernel::schema::SchemaError;
use kusanagi_kernel::transport::TransportError;
use kusanagi_runtime::call::CallError;
use thiserror::Error;

/// An action attempted something its schema does not permit.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PolicyError {
    #[error("Call to Service \"{service}\" ({version}) action \"{action}\" is not declared")]
    CallNotDeclared {
        service: String,
        version: String,
        action: String,
    },

    #[error(
        "Deferred call to Service \"{service}\" ({version}) action \"{action}\" is not declared"
    )]
    DeferNotDeclared {
        service: String,
        version: String,
        action: String,
    },

    #[error(
        "Remote call to \"{address}\" Service \"{service}\" ({version}) action \"{action}\" is not declared"
    )]
    RemoteNotDeclared {
        address: String,
        service: String,
        version: String,
        action: String,
    },

    #[error("Action \"{action}\" of Service \"{service}\" ({version}) does not declare a return value")]
    ReturnNotDeclared {
        service: String,
        version: String,
        action: String,
    },

    #[error(
        "Action \"{action}\" of Service \"{service}\" ({version}) declares a return value and cannot be called at run time"
    )]
    RemoteReturnDeclared {
        service: String,
        version: String,
        action: String,
    },

    #[error("File server is not enabled for Service \"{service}\" ({version})")]
    FileServerDisabled { service: String, version: String },

    #[error("Invalid remote address: \"{address}\" (must start with \"ktp://\")")]
    InvalidRemoteAddress { address: String },
}

/// Crate-level error type surfaced by SDK operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SdkError {
    #[error("{0}")]
    Policy(#[from] PolicyError),

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Call(#[from] CallError),

    #[error("{0}")]
    Codec(#[from] CodecError),
}

/// Convenience result alias.
pub type SdkResult<T> = Result<T, SdkError>;
