use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Descriptive metadata about a listed company, as far as the
/// market-data provider exposes it. Saved next to the ledger so it can
/// be shown offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    /// Ticker symbol, uppercased
    pub symbol: String,

    #[serde(default)]
    pub short_name: Option<String>,

    #[serde(default)]
    pub long_name: Option<String>,

    /// Exchange code (e.g., "NMS", "JNB")
    #[serde(default)]
    pub exchange: Option<String>,

    /// Instrument kind (e.g., "EQUITY", "ETF")
    #[serde(default)]
    pub quote_type: Option<String>,

    /// Date the profile was fetched from the provider
    pub fetched_on: NaiveDate,
}

impl CompanyProfile {
    /// Best available display name: long name, then short name, then the symbol.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.long_name
            .as_deref()
            .or(self.short_name.as_deref())
            .unwrap_or(&self.symbol)
    }
}
