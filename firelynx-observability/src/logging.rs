use tracing_subscriber::EnvFilter;

/// Sets up the process-wide `tracing` subscriber. `RUST_LOG` overrides
/// `default_level` when set; `json` switches the output format for log
/// aggregators that expect structured lines instead of human-readable text.
pub fn init_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}
