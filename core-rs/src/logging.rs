//! tracing subscriber setup shared by the CLI and tests

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "ontosync=info,ontosync_core=info"
    } else {
        "ontosync=error,ontosync_core=error"
    }
}

/// Install a stderr fmt subscriber. `RUST_LOG` overrides `verbose`.
/// Does nothing when a global subscriber is already installed.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
