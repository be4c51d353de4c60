//! SDK for writing KUSANAGI Service and Middleware components.
//!
//! A component registers callbacks, then hands control to [`run`]: the
//! runtime parses the CLI input the framework launches the process with,
//! binds the ZMQ server and drives the callbacks for every request the
//! gateway routes in.
//!
//! ```ignore
//! use kusanagi_sdk::prelude::*;
//!
//! fn main() {
//!     let mut service = Service::new();
//!     service.action("read", |mut action: Action| {
//!         let id = action.get_param("id").as_i64();
//!         action.set_entity(serde_json::json!({"id": id}));
//!         Ok(action)
//!     });
//!     std::process::exit(if service.run() { 0 } else { 1 });
//! }
//! ```

// user facing api module
pub mod api;

// component shell module
pub mod component;

// request processor module
pub(crate) mod processor;

// error module
pub mod error;
pub use error::{PolicyError, SdkError, SdkResult};

/// Common imports for component authors.
pub mod prelude {
    pub use crate::api::action::Action;
    pub use crate::api::request::{Request, RequestReturn};
    pub use crate::api::response::Response;
    pub use crate::component::middleware::Middleware;
    pub use crate::component::service::Service;
    pub use crate::error::{PolicyError, SdkError, SdkResult};
    pub use kusanagi_kernel::payload::file::File;
    pub use kusanagi_kernel::payload::param::Param;
    pub use serde_json::Value;
}
