//! Application configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `EFTPOS__`-prefixed environment variables (`EFTPOS__SESSION__LIFETIME_SECS=60`).

use crate::domain::status::{DEFAULT_LIFETIME_SECS, LOW_TIME_THRESHOLD_SECS};
use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::Validate;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "Eftpos";

/// Price quote source configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuoteConfig {
    /// Conversion API base URL
    #[validate(url)]
    pub base_url: String,

    /// Currency the terminal charges in
    #[validate(length(min = 1))]
    pub source_currency: String,

    /// Currency the quote is expressed in
    #[validate(length(min = 1))]
    pub target_currency: String,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 120))]
    pub timeout_secs: u64,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coinconvert.net".to_string(),
            source_currency: "usd".to_string(),
            target_currency: "btc".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Payment session timing
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionConfig {
    /// Countdown start value in seconds
    #[validate(range(min = 1, max = 3600))]
    pub lifetime_secs: u32,

    /// Remaining seconds at or below which time is shown as urgent
    pub low_time_threshold_secs: u32,

    /// Delay before a failed tap attempt returns to waiting
    #[validate(range(max = 60000))]
    pub error_reset_ms: u64,

    /// Delay between a verified tap and teardown
    #[validate(range(max = 60000))]
    pub success_grace_ms: u64,

    /// Delay between expiry and teardown
    #[validate(range(max = 60000))]
    pub expiry_grace_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime_secs: DEFAULT_LIFETIME_SECS,
            low_time_threshold_secs: LOW_TIME_THRESHOLD_SECS,
            error_reset_ms: 2000,
            success_grace_ms: 2000,
            expiry_grace_ms: 3000,
        }
    }
}

impl SessionConfig {
    pub fn error_reset(&self) -> Duration {
        Duration::from_millis(self.error_reset_ms)
    }

    pub fn success_grace(&self) -> Duration {
        Duration::from_millis(self.success_grace_ms)
    }

    pub fn expiry_grace(&self) -> Duration {
        Duration::from_millis(self.expiry_grace_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[validate(length(min = 1))]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub quote: QuoteConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from defaults, a file and the environment.
    ///
    /// With `path` the file must exist; without it `Eftpos.toml` is used when
    /// present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("EFTPOS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.validate_config()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate_config(&self) -> Result<()> {
        self.quote
            .validate()
            .map_err(|e| PaymentError::Config(format!("quote: {e}")))?;
        self.session
            .validate()
            .map_err(|e| PaymentError::Config(format!("session: {e}")))?;
        self.logging
            .validate()
            .map_err(|e| PaymentError::Config(format!("logging: {e}")))?;

        if self.session.low_time_threshold_secs > self.session.lifetime_secs {
            return Err(PaymentError::Config(format!(
                "session: low_time_threshold_secs ({}) exceeds lifetime_secs ({})",
                self.session.low_time_threshold_secs, self.session.lifetime_secs
            )));
        }
        Ok(())
    }
}
