//! Middleware component.

use crate::api::request::{Request, RequestReturn};
use crate::api::response::Response;
use crate::component::{ComponentBase, ComponentInfo, Resource};
use crate::processor::{Callbacks, RequestCallback, ResponseCallback};
use kusanagi_runtime::cli::ComponentKind;
use std::sync::Arc;

/// A KUSANAGI Middleware component.
///
/// A middleware can hook the request side, the response side, or both.
#[derive(Default)]
pub struct Middleware {
    base: ComponentBase,
    request: Option<RequestCallback>,
    response: Option<ResponseCallback>,
}

impl Middleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the request callback.
    ///
    /// Return the [`Request`] to forward it (possibly rewritten), or a
    /// [`Response`] to short-circuit the request.
    pub fn request<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(Request) -> anyhow::Result<RequestReturn> + Send + Sync + 'static,
    {
        self.request = Some(Arc::new(callback));
        self
    }

    /// Register the response callback.
    pub fn response<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(Response) -> anyhow::Result<Response> + Send + Sync + 'static,
    {
        self.response = Some(Arc::new(callback));
        self
    }

    /// Register a hook run once before the server binds.
    pub fn startup<F>(&mut self, hook: F) -> &mut Self
    where
        F: FnOnce(&ComponentInfo) -> anyhow::Result<()> + 'static,
    {
        self.base.startup(hook);
        self
    }

    /// Register a hook run once after the server stops.
    pub fn shutdown<F>(&mut self, hook: F) -> &mut Self
    where
        F: FnOnce(&ComponentInfo) -> anyhow::Result<()> + 'static,
    {
        self.base.shutdown(hook);
        self
    }

    /// Register a hook invoked for every userland callback error.
    pub fn error<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&anyhow::Error) + Send + Sync + 'static,
    {
        self.base.error(hook);
        self
    }

    /// Register a resource created at startup and frozen afterwards.
    pub fn set_resource<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: FnOnce(&ComponentInfo) -> anyhow::Result<Resource> + 'static,
    {
        self.base.set_resource(name, factory);
        self
    }

    /// Parse the CLI input and serve requests until shutdown.
    pub fn run(&mut self) -> bool {
        let callbacks = Callbacks::Middleware {
            request: self.request.clone(),
            response: self.response.clone(),
        };
        self.base.run(ComponentKind::Middleware, callbacks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hooks_register() {
        let mut middleware = Middleware::new();
        middleware
            .request(|request| Ok(request.into()))
            .response(|response| Ok(response))
            .error(|_| {});
        assert!(middleware.request.is_some());
        assert!(middleware.response.is_some());
    }
}
