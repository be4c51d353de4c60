// codec module
pub mod codec;

// version matching module
pub mod version;

// payload model module
pub mod payload;

// transport module
pub mod transport;

// schema module
pub mod schema;

// error module
pub mod error;
pub use error::{KernelError, KernelResult};
