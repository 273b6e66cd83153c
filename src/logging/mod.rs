//! Application logging.
//!
//! Framework diagnostics go straight through `tracing`. Application code gets
//! a [`Logger`] with named channels, each with its own level floor, handlers
//! and processors.

use crate::config::AppConfig;
use crate::error::{MantleError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

mod handler;
mod logger;
mod processor;

pub use handler::{LogHandler, MemoryHandler, StreamHandler, TracingHandler};
pub use logger::{Channel, Logger};
pub use processor::{LogProcessor, ProcessIdProcessor, PsrLogMessageProcessor, TagProcessor};

/// Log severities, least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[strum(to_string = "debug", serialize = "trace")]
    Debug,
    Info,
    Notice,
    #[strum(to_string = "warning", serialize = "warn")]
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl Level {
    /// Parse a level name, failing with `InvalidLevel`.
    pub fn parse(name: &str) -> Result<Self> {
        Level::from_str(name.trim()).map_err(|_| MantleError::InvalidLevel(name.to_string()))
    }

    pub fn as_upper(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Notice => "NOTICE",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Alert => "ALERT",
            Level::Emergency => "EMERGENCY",
        }
    }
}

/// One log entry on its way through processors and handlers.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub channel: String,
    pub level: Level,
    pub message: String,
    pub context: Map<String, Value>,
    pub extra: Map<String, Value>,
    pub datetime: DateTime<Utc>,
}

impl LogRecord {
    pub fn new(channel: &str, level: Level, message: impl Into<String>, context: Value) -> Self {
        let context = match context {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("context".to_string(), other);
                map
            }
        };
        Self {
            channel: channel.to_string(),
            level,
            message: message.into(),
            context,
            extra: Map::new(),
            datetime: Utc::now(),
        }
    }
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(config: &AppConfig) -> Result<()> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .map_err(|err| MantleError::Internal(format!("failed to install tracing subscriber: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Notice);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Alert < Level::Emergency);
    }

    #[test]
    fn test_level_names() {
        assert_eq!(Level::parse("WARNING").unwrap(), Level::Warning);
        assert_eq!(Level::parse("warn").unwrap(), Level::Warning);
        assert_eq!(Level::Critical.to_string(), "critical");
        assert!(matches!(
            Level::parse("verbose"),
            Err(MantleError::InvalidLevel(name)) if name == "verbose"
        ));
    }

    #[test]
    fn test_scalar_context_is_wrapped() {
        let record = LogRecord::new("app", Level::Info, "hi", json!(5));
        assert_eq!(record.context["context"], json!(5));
        assert!(LogRecord::new("app", Level::Info, "hi", Value::Null).context.is_empty());
    }
}
