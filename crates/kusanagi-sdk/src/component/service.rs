//! Service component.

use crate::api::action::Action;
use crate::component::{ComponentBase, ComponentInfo, Resource};
use crate::processor::{ActionCallback, Callbacks};
use kusanagi_runtime::cli::ComponentKind;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A KUSANAGI Service component.
///
/// Register one callback per action, then call [`Service::run`].
#[derive(Default)]
pub struct Service {
    base: ComponentBase,
    actions: BTreeMap<String, ActionCallback>,
}

impl Service {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action callback; registering a name twice replaces the
    /// previous callback.
    pub fn action<F>(&mut self, name: &str, callback: F) -> &mut Self
    where
        F: Fn(Action) -> anyhow::Result<Action> + Send + Sync + 'static,
    {
        self.actions.insert(name.to_string(), Arc::new(callback));
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
    ///
    /// Returns `true` when the process finished cleanly; the caller maps
    /// this onto the process exit code.
    pub fn run(&mut self) -> bool {
        let callbacks = Callbacks::Service(std::mem::take(&mut self.actions));
        self.base.run(ComponentKind::Service, callbacks)
    }
}
