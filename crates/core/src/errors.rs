use thiserror::Error;

/// Unified error type for the entire stock-ledger-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Caller input ────────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("Provider error ({provider}): {message}")]
    ProviderError {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No provider registered for {0}")]
    NoProvider(String),

    #[error("Price not available for {symbol} in {currency} on {date}")]
    PriceNotAvailable {
        symbol: String,
        currency: String,
        date: String,
    },

    // ── Storage / File ──────────────────────────────────────────────
    #[error("Stored data is corrupt: {0}")]
    StorageError(String),

    #[error("File I/O error: {0}")]
    FileIO(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── Metrics ─────────────────────────────────────────────────────
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    // ── Configuration ───────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a `CoreError`, for callers that only care
/// whether to fix their input, retry later, or inspect the data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Provider,
    Storage,
    InsufficientData,
    Config,
}

impl CoreError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ValidationError(_) => ErrorKind::Validation,
            CoreError::ProviderError { .. }
            | CoreError::Network(_)
            | CoreError::NoProvider(_)
            | CoreError::PriceNotAvailable { .. } => ErrorKind::Provider,
            CoreError::StorageError(_)
            | CoreError::FileIO(_)
            | CoreError::Serialization(_)
            | CoreError::Deserialization(_) => ErrorKind::Storage,
            CoreError::InsufficientData(_) => ErrorKind::InsufficientData,
            CoreError::Config(_) => ErrorKind::Config,
        }
    }

    /// Network and upstream service failures, which may succeed on retry.
    ///
    /// A missing provider or a price the source does not have will fail the
    /// same way again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Network(_) | CoreError::ProviderError { .. })
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(e: toml::de::Error) -> Self {
        CoreError::Config(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors often contain full URLs, and Alpha Vantage keys
        // travel in the query string.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
