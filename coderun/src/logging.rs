//! Diagnostic tracing for the `coderun` binary.
//!
//! Diagnostics always go to stderr. Stdout belongs to the echoed execution
//! log, and the log file itself only ever holds the start/end markers, stage
//! lines and child output, whatever `RUST_LOG` says.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Directive used when `RUST_LOG` is unset or does not parse.
const DEFAULT_DIRECTIVE: &str = "warn";

/// Install the global subscriber. Call once, before any subcommand runs.
///
/// `RUST_LOG=coderun=debug coderun execute` shows detection, every spawned
/// step and timeout kills.
pub fn init() {
    let filter = env_filter(std::env::var("RUST_LOG").ok().as_deref());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn env_filter(raw: Option<&str>) -> EnvFilter {
    raw.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}
