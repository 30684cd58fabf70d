use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Level for the crate's own events. Retry exhaustion and price outages log
/// at warn, so they stay visible without `--verbose`.
fn app_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    }
}

/// Logs go to stderr so `watch` output on stdout stays a clean table.
pub fn init_logging(verbose: bool) {
    let level = app_level(verbose);
    let app_filter = Targets::new().with_target("goldwatch", level);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("goldwatch={level}")));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .pretty()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(app_filter)
        .with(env_filter)
        .init();
}
