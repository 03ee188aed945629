use std::path::{Path, PathBuf};

use crate::errors::CoreError;

/// File name of the purchase ledger inside a ticker directory.
pub const LEDGER_FILE: &str = "purchases.json";

/// File name of the saved company profile inside a ticker directory.
pub const PROFILE_FILE: &str = "profile.json";

/// File name of the exported price history inside a ticker directory.
pub const HISTORY_FILE: &str = "history.csv";

/// Where everything lives on disk.
///
/// ```text
/// <base_directory>/
///   AAPL/
///     purchases.json
///     profile.json
///     history.csv
///   CPI.JO/
///     ...
/// ```
///
/// This is the only place paths are built; services receive a layout at
/// construction and never join paths themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    base_directory: PathBuf,
}

impl StorageLayout {
    pub fn new(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
        }
    }

    #[must_use]
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn ticker_dir(&self, ticker: &str) -> Result<PathBuf, CoreError> {
        let ticker = normalize_ticker(ticker)?;
        Ok(self.base_directory.join(ticker))
    }

    pub fn ledger_path(&self, ticker: &str) -> Result<PathBuf, CoreError> {
        Ok(self.ticker_dir(ticker)?.join(LEDGER_FILE))
    }

    pub fn profile_path(&self, ticker: &str) -> Result<PathBuf, CoreError> {
        Ok(self.ticker_dir(ticker)?.join(PROFILE_FILE))
    }

    pub fn history_path(&self, ticker: &str) -> Result<PathBuf, CoreError> {
        Ok(self.ticker_dir(ticker)?.join(HISTORY_FILE))
    }

    /// Create the ticker directory (and the base directory) if missing.
    /// Run once before any ledger operation on that ticker.
    pub fn ensure_ticker_dir(&self, ticker: &str) -> Result<PathBuf, CoreError> {
        let dir = self.ticker_dir(ticker)?;
        std::fs::create_dir_all(&dir).map_err(|e| {
            CoreError::FileIO(format!("Failed to create {}: {e}", dir.display()))
        })?;
        Ok(dir)
    }
}

/// Upper-case a ticker and make sure it is safe to use as a directory name.
///
/// Allowed: ASCII letters, digits, and `.` `-` `^` `=` `_` (Yahoo uses all
/// of these, e.g. "CPI.JO", "BRK-B", "^GSPC", "EURUSD=X").
pub fn normalize_ticker(ticker: &str) -> Result<String, CoreError> {
    let upper = ticker.trim().to_uppercase();
    let valid_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=' | '_');
    if upper.is_empty() || upper.len() > 20 || !upper.chars().all(valid_char) {
        return Err(CoreError::ValidationError(format!(
            "Invalid ticker '{ticker}': use 1-20 letters, digits or . - ^ = _"
        )));
    }
    if upper.chars().all(|c| c == '.') {
        return Err(CoreError::ValidationError(format!(
            "Invalid ticker '{ticker}'"
        )));
    }
    Ok(upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_built_under_ticker_dir() {
        let layout = StorageLayout::new("/data");
        assert_eq!(
            layout.ledger_path("aapl").unwrap(),
            PathBuf::from("/data/AAPL/purchases.json")
        );
        assert_eq!(
            layout.history_path("cpi.jo").unwrap(),
            PathBuf::from("/data/CPI.JO/history.csv")
        );
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(normalize_ticker("..").is_err());
        assert!(normalize_ticker("../etc").is_err());
        assert!(normalize_ticker("a/b").is_err());
        assert!(normalize_ticker("").is_err());
    }

    #[test]
    fn accepts_yahoo_symbols() {
        for t in ["CPI.JO", "BRK-B", "^GSPC", "EURUSD=X"] {
            assert!(normalize_ticker(t).is_ok(), "{t}");
        }
    }
}
