use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize stdout tracing for a service binary, relay or consumer alike.
///
/// Filter comes from `RUST_LOG` (`info` when unset). Output is one JSON object
/// per line unless `LOG_FORMAT=text`, which switches to compact human-readable
/// lines for local runs. Calls after the first are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = log_format_is_json(std::env::var("LOG_FORMAT").ok().as_deref());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer().compact()))
        .try_init();
}

fn log_format_is_json(format: Option<&str>) -> bool {
    !matches!(format, Some(f) if f.eq_ignore_ascii_case("text"))
}
