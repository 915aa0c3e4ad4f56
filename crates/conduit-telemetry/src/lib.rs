//! Telemetry for Conduit
//!
//! Installs the process-wide `tracing` subscriber. Library crates only emit
//! events through the `tracing` facade; binaries call [`init`] once at
//! startup. Log lines go to stderr so command output on stdout stays clean.

use conduit_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize logging from configuration
///
/// Filter precedence: `RUST_LOG`, then the configured `log_filter`, then
/// `default_filter`.
///
/// # Errors
///
/// Returns an error if a filter directive is invalid or a global subscriber
/// is already installed.
pub fn init(config: Option<&TelemetryConfig>, default_filter: &str) -> anyhow::Result<()> {
    let filter = build_filter(config.and_then(|c| c.log_filter.as_deref()), default_filter)?;
    let format = config.map(|c| c.format).unwrap_or_default();

    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

fn build_filter(configured: Option<&str>, default_filter: &str) -> anyhow::Result<EnvFilter> {
    if let Ok(from_env) = EnvFilter::try_from_default_env() {
        return Ok(from_env);
    }

    let directives = configured.unwrap_or(default_filter);
    EnvFilter::try_new(directives).map_err(|e| anyhow::anyhow!("invalid log filter `{directives}`: {e}"))
}
