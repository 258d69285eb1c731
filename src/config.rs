//! Configuration for the Inner Weather service.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration for the prediction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Path of the model artifact to load at startup
    pub model_path: PathBuf,

    /// Address the HTTP server binds to
    pub host: IpAddr,

    /// Port the HTTP server binds to (0 for random)
    pub port: u16,

    /// Log filter used when `RUST_LOG` is not set
    pub log_filter: String,

    /// Display name overriding the one stored in the artifact
    pub model_name: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("phase_prediction_model.json"),
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8001,
            log_filter: "info".to_string(),
            model_name: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the default location, or defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: ServiceConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Ok(config)
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("inner-weather")
            .join("config.json")
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}
