use std::net::SocketAddr;
use std::time::Duration;

use figment::providers::Serialized;
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::uno::{UnoUrl, UnoUrlError};

pub const DEFAULT_OFFICE_URL: &str =
    "uno:socket,host=127.0.0.1,port=2002;urp;StarOffice.ComponentContext";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid office URL: {0}")]
    InvalidOfficeUrl(#[from] UnoUrlError),

    #[error("Office binary cannot be empty")]
    EmptyOfficeBinary,

    #[error("Invalid endpoint_attempts: {0}. Must be at least 1")]
    InvalidAttempts(u32),

    #[error("Invalid {0}: must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Failed to assemble configuration: {0}")]
    Extract(#[from] Box<figment::Error>),
}

/// Runtime settings of the bridge.
///
/// Built-in defaults, overridden field by field from the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// HTTP listen address
    pub bind: SocketAddr,
    pub office_url: String,
    /// Program started by `launch`
    pub office_binary: String,
    /// Process name terminated before launching
    pub stale_process: String,
    pub endpoint_attempts: u32,
    pub endpoint_interval_ms: u64,
    pub document_timeout_ms: u64,
    pub document_interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub call_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub log_level: String,
    pub show_qr: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            office_url: DEFAULT_OFFICE_URL.to_string(),
            office_binary: "libreoffice".to_string(),
            stale_process: "soffice.bin".to_string(),
            endpoint_attempts: 20,
            endpoint_interval_ms: 500,
            document_timeout_ms: 60_000,
            document_interval_ms: 500,
            connect_timeout_ms: 2_000,
            call_timeout_ms: 5_000,
            request_timeout_ms: 15_000,
            log_level: "info".to_string(),
            show_qr: true,
        }
    }
}

/// Values given on the command line; unset fields keep their default
#[derive(Debug, Default, Clone, Serialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<SocketAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_binary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_qr: Option<bool>,
}

impl BridgeConfig {
    pub fn load(overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let config: BridgeConfig = Figment::new()
            .merge(Serialized::defaults(BridgeConfig::default()))
            .merge(Serialized::defaults(overrides))
            .extract()
            .map_err(Box::new)?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.office_url()?;

        if self.office_binary.trim().is_empty() {
            return Err(ConfigError::EmptyOfficeBinary);
        }

        if self.endpoint_attempts == 0 {
            return Err(ConfigError::InvalidAttempts(self.endpoint_attempts));
        }

        for (name, value) in [
            ("endpoint_interval_ms", self.endpoint_interval_ms),
            ("document_timeout_ms", self.document_timeout_ms),
            ("document_interval_ms", self.document_interval_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("call_timeout_ms", self.call_timeout_ms),
            ("request_timeout_ms", self.request_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDuration(name));
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.log_level.clone()));
        }

        Ok(())
    }

    pub fn office_url(&self) -> Result<UnoUrl, UnoUrlError> {
        self.office_url.parse()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
