use crate::logging::LogRecord;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

/// Enriches a record before it reaches the handlers.
pub trait LogProcessor: Send + Sync {
    fn process(&self, record: &mut LogRecord);
}

impl<F> LogProcessor for F
where
    F: Fn(&mut LogRecord) + Send + Sync,
{
    fn process(&self, record: &mut LogRecord) {
        self(record)
    }
}

/// Adds a fixed list of tags under `extra.tags`.
#[derive(Debug, Clone, Default)]
pub struct TagProcessor {
    tags: Vec<String>,
}

impl TagProcessor {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
    }
}

impl LogProcessor for TagProcessor {
    fn process(&self, record: &mut LogRecord) {
        record
            .extra
            .insert("tags".to_string(), Value::from(self.tags.clone()));
    }
}

/// Adds the current process id under `extra.process_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessIdProcessor;

impl LogProcessor for ProcessIdProcessor {
    fn process(&self, record: &mut LogRecord) {
        record
            .extra
            .insert("process_id".to_string(), Value::from(std::process::id()));
    }
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_.]+)\}").expect("placeholder regex is valid"));

/// Replaces `{key}` placeholders in the message with context values.
///
/// Strings are inserted as-is, other values as JSON; unknown keys are left
/// untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PsrLogMessageProcessor;

impl LogProcessor for PsrLogMessageProcessor {
    fn process(&self, record: &mut LogRecord) {
        if !record.message.contains('{') {
            return;
        }
        let context = &record.context;
        let message = PLACEHOLDER.replace_all(&record.message, |captures: &Captures<'_>| {
            match context.get(&captures[1]) {
                Some(Value::String(text)) => text.clone(),
                Some(Value::Null) => "null".to_string(),
                Some(other) => other.to_string(),
                None => captures[0].to_string(),
            }
        });
        record.message = message.into_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Level;
    use serde_json::json;

    fn record(message: &str, context: Value) -> LogRecord {
        LogRecord::new("app", Level::Info, message, context)
    }

    #[test]
    fn test_placeholders_are_interpolated() {
        let mut record = record(
            "user {user} bought {count} items, {missing} stays",
            json!({ "user": "ada", "count": 3 }),
        );
        PsrLogMessageProcessor.process(&mut record);
        assert_eq!(record.message, "user ada bought 3 items, {missing} stays");
    }

    #[test]
    fn test_tags_and_process_id() {
        let mut record = record("tagged", Value::Null);
        TagProcessor::new(["web", "v1"]).process(&mut record);
        ProcessIdProcessor.process(&mut record);
        assert_eq!(record.extra["tags"], json!(["web", "v1"]));
        assert_eq!(record.extra["process_id"], json!(std::process::id()));
    }

    #[test]
    fn test_closures_are_processors() {
        let processor = |record: &mut LogRecord| {
            record.extra.insert("request_id".into(), json!("abc"));
        };
        let mut record = record("closure", Value::Null);
        processor.process(&mut record);
        assert_eq!(record.extra["request_id"], "abc");
    }
}
