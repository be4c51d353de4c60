//! CLI input definitions using clap.
//!
//! Every component process is launched by the framework with the same flag
//! set; the parsed input carries the component identity, the socket to
//! bind and the execution limits for the whole process lifetime.

use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;

/// Kind of component being run.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Service,
    Middleware,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Service => "service",
            ComponentKind::Middleware => "middleware",
        }
    }
}

/// Input arguments a component process is started with.
#[derive(Parser, Debug, Clone)]
#[command(name = "kusanagi", disable_version_flag = true)]
pub struct Input {
    /// Component kind
    #[arg(short = 'c', long = "component", value_enum)]
    pub component: ComponentKind,

    /// Component name
    #[arg(short = 'n', long = "name")]
    pub name: String,

    /// Component version
    #[arg(short = 'v', long = "version")]
    pub version: String,

    /// Framework version the component was built against
    #[arg(short = 'p', long = "framework-version")]
    pub framework_version: String,

    /// IPC socket name to bind
    #[arg(short = 'i', long = "ipc", conflicts_with = "tcp")]
    pub ipc: Option<String>,

    /// TCP port to bind on localhost
    #[arg(short = 't', long = "tcp")]
    pub tcp: Option<u16>,

    /// Execution timeout per request, in milliseconds
    #[arg(short = 'T', long = "timeout", default_value_t = 30_000)]
    pub timeout: u64,

    /// Log level (syslog numbering, 0 to 7)
    #[arg(short = 'L', long = "log-level", default_value_t = 6)]
    pub log_level: u8,

    /// Enable debug mode
    #[arg(short = 'D', long = "debug")]
    pub debug: bool,

    /// Process a single action reading the command from stdin as JSON
    #[arg(long = "action")]
    pub action: Option<String>,

    /// Component variables as KEY=VALUE pairs
    #[arg(short = 'V', long = "var", value_parser = parse_key_value)]
    pub var: Vec<(String, String)>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("invalid KEY=VALUE pair: \"{raw}\""))
}

impl Input {
    /// Parse the process arguments without exiting on failure.
    pub fn try_parse_args() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }

    /// The ZMQ address the component binds.
    ///
    /// TCP binds on localhost, an explicit IPC socket binds by name, and
    /// otherwise an abstract socket name is derived from the component
    /// identity.
    pub fn socket_address(&self) -> String {
        if let Some(port) = self.tcp {
            return format!("tcp://127.0.0.1:{port}");
        }
        if let Some(socket) = &self.ipc {
            return format!("ipc://{socket}");
        }
        format!(
            "ipc://@kusanagi-{}-{}-{}",
            self.component.as_str(),
            self.name,
            self.version
        )
    }

    pub fn variables(&self) -> BTreeMap<String, String> {
        self.var.iter().cloned().collect()
    }

    /// Component title used in log lines.
    pub fn title(&self) -> String {
        format!("\"{}\" ({})", self.name, self.version)
    }
}
