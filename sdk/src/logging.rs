use std::env;

use anyhow::Result;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Installs the global tracing subscriber.
///
/// The filter is read from `ZKC_LOG`, then `RUST_LOG`, defaulting to `info`. `ZKC_LOG_FORMAT`
/// selects `pretty` (default), `compact` or `json` output.
pub fn init() -> Result<()> {
    let log_format = env::var("ZKC_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_env("ZKC_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match log_format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_env_filter(env_filter)
            .try_init(),
        "compact" => tracing_subscriber::fmt()
            .compact()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .with_env_filter(env_filter)
            .try_init(),
        _ => tracing_subscriber::fmt()
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(env_filter)
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
