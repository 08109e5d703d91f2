// Diagnostic logging setup

use tracing_subscriber::EnvFilter;

/// Install the global subscriber, writing to stderr
///
/// `RUST_LOG` takes precedence; otherwise `verbosity` selects warn, info or
/// debug for this crate. Calling it twice is harmless.
pub fn init(verbosity: u8) {
    let default_directive = match verbosity {
        0 => "warn",
        1 => "serverctl=info,warn",
        _ => "serverctl=debug,info",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
