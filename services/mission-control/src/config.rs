use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use skydrop_core::config::MissionControlConfig;
use skydrop_core::logging::LogFormat;
use skydrop_core::ConfigError;

#[derive(Debug, Error)]
pub enum ServiceConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error(transparent)]
    Mission(#[from] ConfigError),
}

/// Process-level settings read from the environment
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub orders_api_base: String,
    pub database_path: PathBuf,
    pub mission_config_path: Option<PathBuf>,
    pub status_interval: Duration,
    pub log_format: LogFormat,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ServiceConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServiceConfigError> {
        let port = match lookup("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| ServiceConfigError::InvalidValue { key: "PORT", value })?,
            None => 8080,
        };
        let status_interval_ms: u64 = match lookup("STATUS_INTERVAL_MS") {
            Some(value) => value
                .parse()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ServiceConfigError::InvalidValue {
                    key: "STATUS_INTERVAL_MS",
                    value,
                })?,
            None => 2000,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            orders_api_base: lookup("ORDERS_API_BASE")
                .unwrap_or_else(|| "http://127.0.0.1:8001".to_string()),
            database_path: lookup("SKYDROP_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("drone_orders.db")),
            mission_config_path: lookup("SKYDROP_CONFIG").map(PathBuf::from),
            status_interval: Duration::from_millis(status_interval_ms),
            log_format: LogFormat::from_env_value(lookup("LOG_FORMAT").as_deref()),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Mission configuration from `SKYDROP_CONFIG`, or the built-in defaults
    pub fn mission_config(&self) -> Result<MissionControlConfig, ServiceConfigError> {
        match &self.mission_config_path {
            Some(path) => Ok(MissionControlConfig::from_file(path)?),
            None => Ok(MissionControlConfig::default()),
        }
    }
}
