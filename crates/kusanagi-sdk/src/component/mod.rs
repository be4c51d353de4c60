//! Component shell shared by services and middlewares.
//!
//! Holds the lifecycle hooks, the userland resource registry and the
//! common `run()` plumbing: parse the CLI input, set up logging, run the
//! startup hook, serve requests (or process one stdin action) and run the
//! shutdown hook. Resources are created during startup and are read-only
//! afterwards.

pub mod middleware;
pub mod service;

use crate::processor::ComponentProcessor;
use kusanagi_runtime::cli::{ComponentKind, Input};
use kusanagi_runtime::server::{Server, ServerConfig, stdio};
use kusanagi_runtime::logging;
use kusanagi_kernel::schema::SchemaRegistry;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

/// A userland resource stored in the component registry.
pub type Resource = Arc<dyn Any + Send + Sync>;

type ResourceFactory = Box<dyn FnOnce(&ComponentInfo) -> anyhow::Result<Resource>>;
type LifecycleHook = Box<dyn FnOnce(&ComponentInfo) -> anyhow::Result<()>>;

/// Hook invoked for every error returned by a userland callback.
pub type ErrorHook = Arc<dyn Fn(&anyhow::Error) + Send + Sync>;

/// Static identity of the running component.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub kind: ComponentKind,
    pub name: String,
    pub version: String,
    pub framework_version: String,

    /// The address this component binds; run-time calls connect back to it.
    pub address: String,

    pub variables: BTreeMap<String, String>,
    pub debug: bool,
}

impl ComponentInfo {
    fn from_input(input: &Input) -> Self {
        Self {
            kind: input.component,
            name: input.name.clone(),
            version: input.version.clone(),
            framework_version: input.framework_version.clone(),
            address: input.socket_address(),
            variables: input.variables(),
            debug: input.debug,
        }
    }
}

/// Lifecycle state shared by [`service::Service`] and
/// [`middleware::Middleware`].
#[derive(Default)]
pub(crate) struct ComponentBase {
    startup: Option<LifecycleHook>,
    shutdown: Option<LifecycleHook>,
    error: Option<ErrorHook>,
    resources: Vec<(String, ResourceFactory)>,
}

impl ComponentBase {
    pub(crate) fn startup<F>(&mut self, hook: F)
    where
        F: FnOnce(&ComponentInfo) -> anyhow::Result<()> + 'static,
    {
        self.startup = Some(Box::new(hook));
    }

    pub(crate) fn shutdown<F>(&mut self, hook: F)
    where
        F: FnOnce(&ComponentInfo) -> anyhow::Result<()> + 'static,
    {
        self.shutdown = Some(Box::new(hook));
    }

    pub(crate) fn error<F>(&mut self, hook: F)
    where
        F: Fn(&anyhow::Error) + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(hook));
    }

    pub(crate) fn set_resource<F>(&mut self, name: &str, factory: F)
    where
        F: FnOnce(&ComponentInfo) -> anyhow::Result<Resource> + 'static,
    {
        self.resources.push((name.to_string(), Box::new(factory)));
    }

    /// Shared `run()` body; `callbacks` is the kind-specific dispatch table.
    pub(crate) fn run(&mut self, expected: ComponentKind, callbacks: crate::processor::Callbacks) -> bool {
        let input = match Input::try_parse_args() {
            Ok(input) => input,
            Err(err) => {
                eprintln!("{err}");
                return false;
            }
        };
        if input.component != expected {
            eprintln!(
                "Component started as \"{}\" but built as \"{}\"",
                input.component.as_str(),
                expected.as_str()
            );
            return false;
        }

        logging::init(input.log_level, input.debug);
        let info = Arc::new(ComponentInfo::from_input(&input));
        info!(
            "Starting {} {} using framework version {}",
            info.kind.as_str(),
            input.title(),
            info.framework_version
        );

        // Resources are created once here; the registry is read-only for
        // the rest of the process lifetime.
        let mut resources = BTreeMap::new();
        for (name, factory) in self.resources.drain(..) {
            match factory(&info) {
                Ok(resource) => {
                    resources.insert(name, resource);
                }
                Err(err) => {
                    error!("Failed to create resource \"{name}\": {err}");
                    return false;
                }
            }
        }
        let resources = Arc::new(resources);

        if let Some(hook) = self.startup.take() {
            if let Err(err) = hook(&info) {
                error!("Startup failed: {err}");
                return false;
            }
        }

        let processor = Arc::new(ComponentProcessor::new(
            info.clone(),
            resources,
            callbacks,
            self.error.clone(),
        ));

        let success = match &input.action {
            Some(action) => match stdio::run_stdin_action(processor.as_ref(), action, input.timeout) {
                Ok(output) => {
                    println!("{output}");
                    true
                }
                Err(err) => {
                    error!("Failed to process action \"{action}\": {err}");
                    false
                }
            },
            None => {
                let config = ServerConfig {
                    address: info.address.clone(),
                    name: info.name.clone(),
                    version: info.version.clone(),
                    timeout_ms: input.timeout,
                };
                let server = Server::new(config, SchemaRegistry::new(), processor);
                match server.run() {
                    Ok(()) => true,
                    Err(err) => {
                        error!("Component failed: {err}");
                        false
                    }
                }
            }
        };

        if let Some(hook) = self.shutdown.take() {
            if let Err(err) = hook(&info) {
                error!("Shutdown failed: {err}");
                return false;
            }
        }
        success
    }
}
