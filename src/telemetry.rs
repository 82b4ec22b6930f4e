use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Log line format on stderr
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("invalid log format: {s:?}")),
        }
    }
}

/// Install the process-wide subscriber.
///
/// Logs go to stderr so stdout carries only command output. The level comes
/// from `RUST_LOG`, defaulting to `info`. Called once from `main`; library
/// components never touch global logging state and only emit into the span
/// they were constructed with.
pub fn init_telemetry(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
    }

    Ok(())
}

/// Generate a correlation ID for linking the events of one invocation
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create the span a command's components log under
pub fn create_operation_span(
    operation: &str,
    workflow_id: Option<u64>,
    correlation_id: Option<&str>,
) -> tracing::Span {
    tracing::info_span!(
        "msgenctl",
        operation = operation,
        workflow.id = workflow_id,
        correlation.id = correlation_id,
    )
}
