use crate::error::{MantleError, Result};
use dashmap::DashMap;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

/// Configuration service
///
/// A key/value store seeded from the process environment.
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    pub fn new() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    /// An empty store, not seeded from the environment.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a value, `Ok(None)` when the key is absent.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|_| {
                    MantleError::Internal(format!("invalid value for {key}: '{raw}'"))
                })
            })
            .transpose()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }
}

/// What the exception middleware does with errors outside the HTTP exception
/// family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum UnhandledErrors {
    /// Leave them to bubble out of the router.
    #[default]
    Propagate,
    /// Answer with a bare 500.
    InternalServerError,
}

/// Typed application settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_channel: String,
    pub unhandled_errors: UnhandledErrors,
    pub max_body_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_channel: "app".to_string(),
            unhandled_errors: UnhandledErrors::Propagate,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn from_service(config: &ConfigService) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: config.get_or("MANTLE_HOST", &defaults.host),
            port: config.get_parsed("MANTLE_PORT")?.unwrap_or(defaults.port),
            log_level: config.get_or("MANTLE_LOG_LEVEL", &defaults.log_level),
            log_channel: config.get_or("MANTLE_LOG_CHANNEL", &defaults.log_channel),
            unhandled_errors: config
                .get_parsed("MANTLE_UNHANDLED_ERRORS")?
                .unwrap_or(defaults.unhandled_errors),
            max_body_bytes: config
                .get_parsed("MANTLE_MAX_BODY_BYTES")?
                .unwrap_or(defaults.max_body_bytes),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_service(&ConfigService::new())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
