use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` wins; otherwise the crate logs at info, or debug when verbose.
fn env_filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose {
        "course_sync=debug,info"
    } else {
        "course_sync=info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Human-readable output for interactive runs.
pub fn init_cli_logger(verbose: bool) {
    let layer = fmt::layer().with_target(false).without_time().compact();
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(layer)
        .init();
}

/// JSON lines, for log shippers.
pub fn init_json_logger(verbose: bool) {
    let layer = fmt::layer()
        .json()
        .with_current_span(false)
        .flatten_event(true);
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(layer)
        .init();
}
