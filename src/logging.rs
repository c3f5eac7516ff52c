use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level implied by the global flags. `--debug` wins over `--no-warnings`.
pub fn level_for(debug: bool, no_warnings: bool) -> Level {
    if debug {
        Level::DEBUG
    } else if no_warnings {
        Level::ERROR
    } else {
        Level::INFO
    }
}

/// Install the stderr subscriber. `RUST_LOG`, when set, replaces the level.
pub fn init(debug: bool, no_warnings: bool) {
    let level = level_for(debug, no_warnings);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
