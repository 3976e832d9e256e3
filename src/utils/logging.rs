//! Process-wide tracing subscriber.
//!
//! Log records go to stderr; stdout carries only the solver report.

use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

static INIT_GUARD: OnceLock<()> = OnceLock::new();

/// Install the `fmt` subscriber once. `RUST_LOG` overrides `default_level`.
///
/// Later calls are no-ops, as is a call after some other subscriber has been set globally.
pub fn init_tracing(default_level: &str) {
    INIT_GUARD.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_ansi(std::io::stderr().is_terminal());
        let _ = Registry::default().with(filter).with(fmt_layer).try_init();
    });
}
