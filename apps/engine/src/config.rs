//! # Engine Configuration
//!
//! Layered configuration for the engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MOOWWEE_DB_PATH, MOOWWEE_LOG, GOOGLE_MAPS_API_KEY,                 │
//! │     STRIPE_SECRET_KEY, ...                                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/moowwee/engine.toml (Linux)                              │
//! │     ~/Library/Application Support/com.moowwee.engine/engine.toml       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/moowwee/moowwee.db"
//! max_connections = 5
//!
//! [routing]
//! api_key = "..."
//! tier_timeout_ms = 5000
//! fallback_speed_kmh = 40.0
//!
//! [payments]
//! secret_key = "sk_test_..."
//! currency = "usd"
//! success_url = "https://app.moowwee.com/payment/return?session_id={CHECKOUT_SESSION_ID}"
//! cancel_url = "https://app.moowwee.com/payment/cancel"
//!
//! [logging]
//! filter = "info,moowwee=debug,sqlx=warn"
//! ```
//!
//! Missing routing credentials are fine: distances fall back to the
//! haversine estimate. Missing payment credentials only fail settlement.

use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use moowwee_core::DEFAULT_CURRENCY;
use moowwee_routing::RoutingConfig;

const DEFAULT_PAYMENTS_API_URL: &str = "https://api.stripe.com";
const DEFAULT_SUCCESS_URL: &str =
    "http://localhost:5173/payment/return?session_id={CHECKOUT_SESSION_ID}";
const DEFAULT_CANCEL_URL: &str = "http://localhost:5173/payment/cancel";
const DEFAULT_LOG_FILTER: &str = "info,moowwee=debug,sqlx=warn";

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database file. Defaults to the platform data directory.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: 5,
            min_connections: 1,
        }
    }
}

/// `[payments]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsSettings {
    /// Processor base URL.
    pub api_url: String,
    /// Processor secret key. Absent means settlement is unavailable.
    pub secret_key: Option<String>,
    /// ISO 4217 code, lower-case.
    pub currency: String,
    /// Redirect after a successful checkout. `{CHECKOUT_SESSION_ID}` is
    /// filled in by the processor.
    pub success_url: String,
    pub cancel_url: String,
    pub timeout_ms: u64,
}

impl Default for PaymentsSettings {
    fn default() -> Self {
        PaymentsSettings {
            api_url: DEFAULT_PAYMENTS_API_URL.to_string(),
            secret_key: None,
            currency: DEFAULT_CURRENCY.to_string(),
            success_url: DEFAULT_SUCCESS_URL.to_string(),
            cancel_url: DEFAULT_CANCEL_URL.to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl PaymentsSettings {
    /// Returns the secret key if one is set and non-blank.
    pub fn secret_key(&self) -> Option<&str> {
        self.secret_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

// =============================================================================
// Engine Config
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub payments: PaymentsSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`engine.toml`), if it exists
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = match config_path.or_else(Self::default_config_path) {
            Some(path) if path.exists() => {
                info!(?path, "Loading engine config from file");
                Self::from_file(&path)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file without applying overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parses TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies overrides from a key lookup (the process environment in
    /// production).
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(path) = lookup("MOOWWEE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup("MOOWWEE_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_number("MOOWWEE_DB_MAX_CONNECTIONS", &value)?;
        }

        if let Some(key) = lookup("GOOGLE_MAPS_API_KEY") {
            self.routing.api_key = Some(key);
        }
        if let Some(url) = lookup("MOOWWEE_ROUTES_API_URL") {
            self.routing.routes_api_url = url;
        }
        if let Some(url) = lookup("MOOWWEE_DIRECTIONS_API_URL") {
            self.routing.directions_api_url = url;
        }
        if let Some(value) = lookup("MOOWWEE_ROUTING_TIMEOUT_MS") {
            self.routing.tier_timeout_ms = parse_number("MOOWWEE_ROUTING_TIMEOUT_MS", &value)?;
        }

        if let Some(key) = lookup("STRIPE_SECRET_KEY") {
            self.payments.secret_key = Some(key);
        }
        if let Some(url) = lookup("MOOWWEE_PAYMENTS_API_URL") {
            self.payments.api_url = url;
        }
        if let Some(url) = lookup("MOOWWEE_FRONTEND_URL") {
            let base = url.trim_end_matches('/');
            self.payments.success_url =
                format!("{}/payment/return?session_id={{CHECKOUT_SESSION_ID}}", base);
            self.payments.cancel_url = format!("{}/payment/cancel", base);
        }

        if let Some(filter) = lookup("MOOWWEE_LOG") {
            self.logging.filter = filter;
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::invalid(
                "database.max_connections",
                "must be greater than 0",
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::invalid(
                "database.min_connections",
                "must not exceed max_connections",
            ));
        }

        if self.routing.tier_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "routing.tier_timeout_ms",
                "must be greater than 0",
            ));
        }
        let speed = self.routing.fallback_speed_kmh;
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ConfigError::invalid(
                "routing.fallback_speed_kmh",
                format!("must be a positive speed, got {}", speed),
            ));
        }
        check_url("routing.routes_api_url", &self.routing.routes_api_url)?;
        check_url("routing.directions_api_url", &self.routing.directions_api_url)?;

        check_url("payments.api_url", &self.payments.api_url)?;
        check_url("payments.success_url", &self.payments.success_url)?;
        check_url("payments.cancel_url", &self.payments.cancel_url)?;
        let currency = &self.payments.currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(ConfigError::invalid(
                "payments.currency",
                format!("expected a lower-case ISO 4217 code, got '{}'", currency),
            ));
        }

        Ok(())
    }

    /// Database file to open.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = directories::ProjectDirs::from("com", "moowwee", "engine")
            .ok_or_else(|| ConfigError::invalid("database.path", "no platform data directory"))?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;

        Ok(data_dir.join("moowwee.db"))
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "moowwee", "engine")
            .map(|dirs| dirs.config_dir().join("engine.toml"))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("'{}' is not a number", value)))
}

fn check_url(key: &str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::invalid(key, e.to_string()))
}

// =============================================================================
// Errors
// =============================================================================

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
