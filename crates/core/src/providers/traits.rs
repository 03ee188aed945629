use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::company::CompanyProfile;
use crate::models::price::{PricePoint, Quote};

/// Source of stock quotes and company metadata.
///
/// Each API (Yahoo Finance, Alpha Vantage) implements this trait. The
/// ledger and the valuation model never see a provider; only the
/// `StockTracker` facade and `MarketDataService` do.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Latest traded price, tagged with the currency it is quoted in.
    async fn get_current_price(&self, symbol: &str) -> Result<Quote, CoreError>;

    /// Closing price of the latest trading day on or before `date`.
    ///
    /// A weekend or holiday resolves to the previous session, never a later one.
    async fn get_historical_close(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Quote, CoreError>;

    /// Daily closes in `[from, to]`, sorted by date.
    async fn get_price_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError>;

    /// Descriptive metadata about the company behind `symbol`.
    async fn get_company_profile(&self, symbol: &str) -> Result<CompanyProfile, CoreError>;
}

/// Source of currency exchange rates.
#[async_trait]
pub trait FxRateProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Multiplier converting one unit of `from` into `to`.
    /// `date = None` asks for the latest rate.
    async fn get_rate(
        &self,
        from: &str,
        to: &str,
        date: Option<NaiveDate>,
    ) -> Result<f64, CoreError>;
}
