use crate::config::AppConfig;
use crate::error::{MantleError, Result};
use crate::logging::{Level, LogHandler, LogProcessor, LogRecord, TracingHandler};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

static CHANNEL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9/_-]+$").expect("channel regex is valid"));

fn normalize(name: &str) -> Result<String> {
    let name = name.to_lowercase();
    if CHANNEL_NAME.is_match(&name) {
        Ok(name)
    } else {
        Err(MantleError::InvalidChannel(name))
    }
}

#[derive(Clone)]
struct ChannelState {
    min_level: Level,
    handlers: Vec<Arc<dyn LogHandler>>,
    processors: Vec<Arc<dyn LogProcessor>>,
}

/// Multi-channel logger.
///
/// Channel names are case-insensitive. Unknown channels requested through
/// [`Logger::channel`] are created with the default handlers and processors.
#[derive(Clone)]
pub struct Logger {
    default_channel: String,
    default_handlers: Vec<Arc<dyn LogHandler>>,
    default_processors: Vec<Arc<dyn LogProcessor>>,
    channels: Arc<DashMap<String, Arc<ChannelState>>>,
}

impl Logger {
    pub fn new(
        default_channel: &str,
        handlers: Vec<Arc<dyn LogHandler>>,
        processors: Vec<Arc<dyn LogProcessor>>,
    ) -> Result<Self> {
        let default_channel = normalize(default_channel)?;
        let logger = Self {
            default_channel: default_channel.clone(),
            default_handlers: handlers,
            default_processors: processors,
            channels: Arc::new(DashMap::new()),
        };
        logger.channels.insert(default_channel, logger.default_state());
        Ok(logger)
    }

    /// Logger writing through `tracing`, configured from the application.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let logger = Self::new(&config.log_channel, vec![Arc::new(TracingHandler)], Vec::new())?;
        logger.set_min_level_to(Level::parse(&config.log_level)?, None)?;
        Ok(logger)
    }

    fn default_state(&self) -> Arc<ChannelState> {
        Arc::new(ChannelState {
            min_level: Level::Debug,
            handlers: self.default_handlers.clone(),
            processors: self.default_processors.clone(),
        })
    }

    /// Handle to the default channel.
    pub fn default(&self) -> Channel {
        Channel {
            name: self.default_channel.clone(),
            channels: Arc::clone(&self.channels),
        }
    }

    pub fn default_channel_name(&self) -> &str {
        &self.default_channel
    }

    /// Handle to `name`, creating the channel if needed.
    pub fn channel(&self, name: &str) -> Result<Channel> {
        let name = normalize(name)?;
        if !self.channels.contains_key(&name) {
            self.channels
                .entry(name.clone())
                .or_insert_with(|| self.default_state());
        }
        Ok(Channel {
            name,
            channels: Arc::clone(&self.channels),
        })
    }

    /// Create or replace a channel.
    pub fn register(
        &self,
        name: &str,
        handlers: Vec<Arc<dyn LogHandler>>,
        processors: Vec<Arc<dyn LogProcessor>>,
    ) -> Result<()> {
        let name = normalize(name)?;
        self.channels.insert(
            name,
            Arc::new(ChannelState {
                min_level: Level::Debug,
                handlers,
                processors,
            }),
        );
        Ok(())
    }

    pub fn has_channel(&self, name: &str) -> bool {
        normalize(name)
            .map(|name| self.channels.contains_key(&name))
            .unwrap_or(false)
    }

    pub fn add_handler(&self, channel: &str, handler: Arc<dyn LogHandler>) -> Result<()> {
        self.update(channel, |state| state.handlers.push(handler))
    }

    pub fn add_processor(&self, channel: &str, processor: Arc<dyn LogProcessor>) -> Result<()> {
        self.update(channel, |state| state.processors.push(processor))
    }

    /// Set the level floor of `channel` (the default channel when `None`)
    /// from a level name.
    pub fn set_min_level(&self, level: &str, channel: Option<&str>) -> Result<()> {
        self.set_min_level_to(Level::parse(level)?, channel)
    }

    pub fn set_min_level_to(&self, level: Level, channel: Option<&str>) -> Result<()> {
        let channel = self.channel(channel.unwrap_or(self.default_channel.as_str()))?;
        self.update(&channel.name, |state| state.min_level = level)
    }

    fn update(&self, channel: &str, change: impl FnOnce(&mut ChannelState)) -> Result<()> {
        let name = normalize(channel)?;
        let mut entry = self
            .channels
            .get_mut(&name)
            .ok_or_else(|| MantleError::UnknownChannel(name.clone()))?;
        // In-flight log calls keep the previous state.
        change(Arc::make_mut(entry.value_mut()));
        Ok(())
    }
}

/// A named channel of a [`Logger`].
#[derive(Clone)]
pub struct Channel {
    name: String,
    channels: Arc<DashMap<String, Arc<ChannelState>>>,
}

impl Channel {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Log `message` with a JSON `context`.
    pub fn log(&self, level: Level, message: impl Into<String>, context: Value) {
        let Some(state) = self
            .channels
            .get(&self.name)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return;
        };
        if level < state.min_level {
            return;
        }

        let mut record = LogRecord::new(&self.name, level, message, context);
        for processor in &state.processors {
            processor.process(&mut record);
        }
        for handler in &state.handlers {
            if let Err(err) = handler.handle(&record) {
                tracing::warn!(channel = %self.name, error = %err, "Log handler failed");
            }
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message, Value::Null);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message, Value::Null);
    }

    pub fn notice(&self, message: impl Into<String>) {
        self.log(Level::Notice, message, Value::Null);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(Level::Warning, message, Value::Null);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message, Value::Null);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(Level::Critical, message, Value::Null);
    }

    pub fn alert(&self, message: impl Into<String>) {
        self.log(Level::Alert, message, Value::Null);
    }

    pub fn emergency(&self, message: impl Into<String>) {
        self.log(Level::Emergency, message, Value::Null);
    }
}
