//! Tracing subscriber setup for hosts and tests.
//!
//! The engine itself only emits through `tracing` macros; installing a
//! subscriber is the host's choice. `init` is a convenience for hosts and
//! test binaries that want console output.

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install a console subscriber filtered by verbosity (overridable via the
/// `LOG` environment variable). Safe to call more than once; later calls are
/// no-ops.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level_from_verbosity(verbosity)).into())
        .with_env_var("LOG")
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}

fn level_from_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
