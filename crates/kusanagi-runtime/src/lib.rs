// cli module
pub mod cli;

// logging module
pub mod logging;

// runtime call client module
pub mod call;

// server module
pub mod server;

// error module
pub mod error;
pub use error::{RuntimeError, RuntimeResult};
