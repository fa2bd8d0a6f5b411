//! Process-wide logging setup for the lifecycle engine.
//!
//! Engine code only emits `tracing` events; whoever embeds it calls [`init`]
//! once at start-up to decide where they go.

pub mod logging;

pub use logging::{DEFAULT_FILTER, LOG_FORMAT_VAR, LogFormat};

/// Install the global subscriber, reading `RUST_LOG` and `COMPTOIR_LOG_FORMAT`.
///
/// Safe to call multiple times; only the first call installs anything.
pub fn init() {
    logging::init(LogFormat::from_env());
}
