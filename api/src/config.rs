//! Service configuration.
//!
//! Loaded from a YAML file when `BAKERY_CONFIG` points at one, otherwise
//! assembled from `BAKERY_*` environment variables. Every field has a default.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};
use crate::prediction::DayMode;

/// Which HTTP surface this deployment exposes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApiVariant {
    /// `POST /predict/` with today's day of week; errors in a 200 body.
    #[default]
    NextDay,
    /// `POST /predict` with the target day of week; errors as HTTP status.
    SameDay,
}

impl ApiVariant {
    pub fn day_mode(self) -> DayMode {
        match self {
            ApiVariant::NextDay => DayMode::Today,
            ApiVariant::SameDay => DayMode::Target,
        }
    }
}

impl FromStr for ApiVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s {
            "next_day" => Ok(ApiVariant::NextDay),
            "same_day" => Ok(ApiVariant::SameDay),
            other => Err(ConfigError::Invalid(format!(
                "unknown variant '{}', expected 'next_day' or 'same_day'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Server binding address
    pub bind_address: String,

    /// Server port
    pub port: u16,

    pub variant: ApiVariant,

    /// Serialized regression model
    pub model_path: PathBuf,

    /// Serialized menu label encoder
    pub encoder_path: PathBuf,

    /// Returned by `GET /`
    pub service_message: String,

    pub cors: CorsConfig,

    /// Default filter when `RUST_LOG` is unset
    pub log_level: String,
}

/// Cross-origin policy. `"*"` mirrors whatever origin the request carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            variant: ApiVariant::default(),
            model_path: PathBuf::from("artifacts/single_model.json"),
            encoder_path: PathBuf::from("artifacts/menu_encoder.json"),
            service_message: "Bakery Prediction API".to_string(),
            cors: CorsConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_credentials: true,
        }
    }
}

impl CorsConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allow_origins.iter().any(|o| o == "*")
    }
}

impl ServiceConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: Into<PathBuf>>(path: P) -> ConfigResult<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config: ServiceConfig = serde_yaml::from_str(&content)
            .map_err(|source| ConfigError::Parse { path, source })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ServiceConfig::default();
        if let Some(addr) = lookup("BAKERY_BIND_ADDRESS") {
            config.bind_address = addr;
        }
        if let Some(port) = lookup("BAKERY_PORT") {
            config.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("invalid port number '{}'", port)))?;
        }
        if let Some(variant) = lookup("BAKERY_VARIANT") {
            config.variant = variant.parse()?;
        }
        if let Some(path) = lookup("BAKERY_MODEL_PATH") {
            config.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("BAKERY_ENCODER_PATH") {
            config.encoder_path = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.bind_address.parse::<IpAddr>().map_err(|_| {
            ConfigError::Invalid(format!("invalid bind address '{}'", self.bind_address))
        })?;
        if self.cors.allow_origins.is_empty() {
            return Err(ConfigError::Invalid(
                "cors.allow_origins must list at least one origin".to_string(),
            ));
        }
        if self.cors.allows_any_origin() && self.cors.allow_origins.len() > 1 {
            return Err(ConfigError::Invalid(
                "cors.allow_origins cannot mix '*' with explicit origins".to_string(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        let ip: IpAddr = self.bind_address.parse().map_err(|_| {
            ConfigError::Invalid(format!("invalid bind address '{}'", self.bind_address))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
