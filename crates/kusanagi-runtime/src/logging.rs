//! Structured logging setup.
//!
//! The CLI log level uses syslog numbering (0..7); it maps onto the
//! tracing level hierarchy before the subscriber is installed. The
//! `RUST_LOG` environment variable can still narrow the filter further.

use tracing_subscriber::EnvFilter;

/// Map a syslog level onto a tracing directive.
pub fn level_directive(level: u8, debug: bool) -> &'static str {
    if debug {
        return "debug";
    }
    match level {
        0..=3 => "error",
        4 => "warn",
        5 | 6 => "info",
        _ => "debug",
    }
}

/// Initialise structured logging for the component process.
///
/// Safe to call more than once; only the first call installs the
/// subscriber.
pub fn init(level: u8, debug: bool) {
    let directive = level_directive(level, debug);
    let filter = EnvFilter::from_default_env().add_directive(
        directive
            .parse()
            .expect("static logging directive must parse"),
    );
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
