use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::CoreError;
use super::currency::normalize_currency;
use super::valuation::FxPolicy;

/// Directory name used under the platform config/data directories.
pub const APP_DIR_NAME: &str = "stock-ledger";

/// User-configurable settings, read from a TOML file.
///
/// Every field has a default, so an empty or missing file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The currency in which all aggregate values are displayed (e.g., "ZAR", "USD").
    pub display_currency: String,

    /// Root directory holding one sub-directory per ticker.
    /// `None` means the platform data directory.
    pub base_directory: Option<PathBuf>,

    /// Which FX rate converts purchase costs.
    pub fx_policy: FxPolicy,

    /// Upper bound for every network call, in seconds.
    pub http_timeout_secs: u64,

    /// Tickers whose Yahoo prices are quoted in cents and need dividing by 100.
    /// Tickers ending in `.JO` are always treated this way.
    pub jse_tickers: Vec<String>,

    /// Optional API keys for providers that require them.
    /// Keys: provider name (e.g., "alphavantage").
    /// Values: the API key string.
    pub api_keys: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            display_currency: "ZAR".to_string(),
            base_directory: None,
            fx_policy: FxPolicy::default(),
            http_timeout_secs: 30,
            jse_tickers: Vec::new(),
            api_keys: HashMap::new(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text and validate them.
    pub fn from_toml_str(text: &str) -> Result<Self, CoreError> {
        let mut settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(CoreError::Config(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// `~/.config/stock-ledger/config.toml` on Linux, the platform
    /// equivalent elsewhere.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
    }

    /// The configured base directory, or the platform data directory.
    pub fn resolved_base_directory(&self) -> Result<PathBuf, CoreError> {
        if let Some(dir) = &self.base_directory {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .ok_or_else(|| {
                CoreError::Config(
                    "No base_directory configured and no platform data directory found".into(),
                )
            })
    }

    /// Whether Yahoo prices for `ticker` need the JSE cents correction.
    #[must_use]
    pub fn is_jse(&self, ticker: &str) -> bool {
        let upper = ticker.trim().to_uppercase();
        upper.ends_with(".JO") || self.jse_tickers.iter().any(|t| t.to_uppercase() == upper)
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Set the display currency. Must be a 3-letter alphabetic code.
    pub fn set_display_currency(&mut self, currency: &str) -> Result<(), CoreError> {
        self.display_currency = normalize_currency(currency)?;
        Ok(())
    }

    fn validate(&mut self) -> Result<(), CoreError> {
        self.display_currency = normalize_currency(&self.display_currency)
            .map_err(|e| CoreError::Config(e.to_string()))?;
        if self.http_timeout_secs == 0 {
            return Err(CoreError::Config(
                "http_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
