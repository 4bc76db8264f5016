use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Structured JSON logging to stdout. `RUST_LOG` controls the level
/// (default `info`); `log` records from actix are forwarded as well.
pub fn init_telemetry() {
    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(formatting_layer)
        .init();
}

/// Same as `init_telemetry`, but tolerates a subscriber that is already set.
/// Integration tests start many servers in one process.
pub fn try_init_telemetry() {
    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::sink)
        .json();

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(formatting_layer)
        .try_init();
}
