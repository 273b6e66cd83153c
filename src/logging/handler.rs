use crate::error::{MantleError, Result};
use crate::logging::{Level, LogRecord};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Final destination of log records.
pub trait LogHandler: Send + Sync {
    fn handle(&self, record: &LogRecord) -> Result<()>;
}

/// Forwards records into `tracing`, keeping the channel as a field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHandler;

impl LogHandler for TracingHandler {
    fn handle(&self, record: &LogRecord) -> Result<()> {
        let channel = record.channel.as_str();
        let message = record.message.as_str();
        let context = Value::Object(record.context.clone());
        match record.level {
            Level::Debug => tracing::debug!(channel, %context, "{message}"),
            Level::Info | Level::Notice => tracing::info!(channel, %context, "{message}"),
            Level::Warning => tracing::warn!(channel, %context, "{message}"),
            Level::Error | Level::Critical | Level::Alert | Level::Emergency => {
                tracing::error!(channel, level = %record.level, %context, "{message}")
            }
        }
        Ok(())
    }
}

enum Target {
    Stderr,
    File {
        writer: NonBlocking,
        _guard: WorkerGuard,
    },
}

/// Writes one formatted line per record to stderr or an appended file.
///
/// Lines look like
/// `[2024-01-01T00:00:00+00:00] app.INFO: message {"key":"value"} []`.
/// File output goes through a background writer that is flushed when the
/// handler is dropped.
pub struct StreamHandler {
    target: Target,
}

impl StreamHandler {
    pub fn stderr() -> Self {
        Self {
            target: Target::Stderr,
        }
    }

    pub fn file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| MantleError::Internal(format!("Invalid log file path: {}", path.display())))?;
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(file_name)
            .build(directory)
            .map_err(|err| MantleError::Internal(format!("Unable to open log file {}: {err}", path.display())))?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        Ok(Self {
            target: Target::File {
                writer,
                _guard: guard,
            },
        })
    }

    pub fn format(record: &LogRecord) -> String {
        format!(
            "[{}] {}.{}: {} {} {}\n",
            record.datetime.to_rfc3339(),
            record.channel,
            record.level.as_upper(),
            record.message,
            format_map(&record.context),
            format_map(&record.extra),
        )
    }
}

fn format_map(map: &Map<String, Value>) -> String {
    if map.is_empty() {
        "[]".to_string()
    } else {
        Value::Object(map.clone()).to_string()
    }
}

impl LogHandler for StreamHandler {
    fn handle(&self, record: &LogRecord) -> Result<()> {
        let line = Self::format(record);
        match &self.target {
            Target::Stderr => std::io::stderr().lock().write_all(line.as_bytes())?,
            Target::File { writer, .. } => writer.clone().write_all(line.as_bytes())?,
        }
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryHandler {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemoryHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .map(|record| record.message)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }
}

impl LogHandler for MemoryHandler {
    fn handle(&self, record: &LogRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_line_format() {
        let mut record = LogRecord::new("orders", Level::Warning, "low stock", json!({ "sku": "A1" }));
        record.extra.insert("process_id".into(), json!(7));

        let line = StreamHandler::format(&record);
        assert!(line.starts_with('['));
        assert!(line.contains("] orders.WARNING: low stock {\"sku\":\"A1\"} {\"process_id\":7}"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_empty_maps_render_as_brackets() {
        let record = LogRecord::new("app", Level::Info, "ready", Value::Null);
        assert!(StreamHandler::format(&record).ends_with("app.INFO: ready [] []\n"));
    }

    #[test]
    fn test_file_handler_appends() {
        let path = std::env::temp_dir().join(format!("mantle-log-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let handler = StreamHandler::file(&path).unwrap();
        handler
            .handle(&LogRecord::new("app", Level::Error, "first", Value::Null))
            .unwrap();
        drop(handler);

        let handler = StreamHandler::file(&path).unwrap();
        handler
            .handle(&LogRecord::new("app", Level::Error, "second", Value::Null))
            .unwrap();
        // Dropping the handler flushes the background writer.
        drop(handler);

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.starts_with('['));
        assert!(contents.contains("app.ERROR: second"));
    }

    #[test]
    fn test_file_path_without_name_is_rejected() {
        assert!(matches!(
            StreamHandler::file(".."),
            Err(MantleError::Internal(_))
        ));
    }
}
