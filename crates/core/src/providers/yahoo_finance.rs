use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::future::Future;
use std::time::Duration;
use time::OffsetDateTime;

use crate::errors::CoreError;
use crate::models::company::CompanyProfile;
use crate::models::price::{PricePoint, Quote};
use super::traits::MarketDataProvider;

const PROVIDER: &str = "Yahoo Finance";

/// How far back a historical-close lookup searches for a trading day.
const HISTORICAL_LOOKBACK_DAYS: i64 = 7;

/// Currency assumed when Yahoo's chart metadata carries none.
const FALLBACK_CURRENCY: &str = "USD";

/// Yahoo Finance API provider for stock/equity prices.
///
/// - **Free**: No API key required.
/// - **No strict rate limits** (unofficial public API).
/// - **Coverage**: Global equities, ETFs, indices, mutual funds.
/// - **Data**: Real-time quotes + full historical OHLCV.
///
/// Prices are returned in the listing's native currency, read from the
/// chart metadata. Johannesburg listings are quoted in cents (ZAc); with
/// the JSE correction enabled every price is divided by 100 and tagged ZAR.
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
    jse_correction: bool,
    timeout: Duration,
}

impl YahooFinanceProvider {
    pub fn new(timeout: Duration) -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new()
            .map_err(|e| CoreError::ProviderError {
                provider: PROVIDER.into(),
                message: format!("Failed to create connector: {e}"),
            })?;
        Ok(Self {
            connector,
            jse_correction: false,
            timeout,
        })
    }

    /// Enable or disable the cents → rand correction for JSE listings.
    pub fn with_jse_correction(mut self, enabled: bool) -> Self {
        self.jse_correction = enabled;
        self
    }

    /// Apply the JSE correction to a raw Yahoo price, if enabled.
    #[must_use]
    pub fn correct_price(&self, raw: f64) -> f64 {
        jse_adjust(raw, self.jse_correction)
    }

    fn quote_currency(&self, reported: Option<String>) -> String {
        if self.jse_correction {
            return "ZAR".to_string();
        }
        match reported {
            Some(code) if !code.trim().is_empty() => code.trim().to_uppercase(),
            _ => {
                tracing::warn!("Yahoo returned no currency, assuming {FALLBACK_CURRENCY}");
                FALLBACK_CURRENCY.to_string()
            }
        }
    }

    /// Run a connector call under the configured timeout, mapping both the
    /// timeout and the connector error to a provider error.
    async fn bounded<T, E, F>(&self, context: String, fut: F) -> Result<T, CoreError>
    where
        E: std::fmt::Display,
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CoreError::ProviderError {
                provider: PROVIDER.into(),
                message: format!("{context}: {e}"),
            }),
            Err(_) => Err(CoreError::ProviderError {
                provider: PROVIDER.into(),
                message: format!("{context}: timed out after {}s", self.timeout.as_secs()),
            }),
        }
    }

    /// Convert a `chrono::NaiveDate` to `time::OffsetDateTime` (midnight UTC).
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let month = time::Month::try_from(date.month() as u8).map_err(|e| {
            CoreError::ValidationError(format!("Invalid month in {date}: {e}"))
        })?;

        let odt = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
            .map_err(|e| CoreError::ValidationError(format!("Invalid date {date}: {e}")))?
            .midnight()
            .assume_utc();
        Ok(odt)
    }

    /// Convert a unix timestamp (seconds) to `chrono::NaiveDate`.
    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }
}

/// Close of the latest bar traded on or before `date`, with its trading day.
///
/// `bars` are `(unix timestamp, close)` pairs in any order. Bars after
/// `date` are never chosen, even when they are closer in time.
fn close_on_or_before(
    bars: impl IntoIterator<Item = (i64, f64)>,
    date: NaiveDate,
) -> Option<(NaiveDate, f64)> {
    bars.into_iter()
        .filter_map(|(ts, close)| {
            let day = YahooFinanceProvider::timestamp_to_naive_date(ts)?;
            (day <= date).then_some((day, ts, close))
        })
        .max_by_key(|(_, ts, _)| *ts)
        .map(|(day, _, close)| (day, close))
}

/// Yahoo reports JSE prices in cents.
fn jse_adjust(raw: f64, enabled: bool) -> f64 {
    if enabled {
        raw / 100.0
    } else {
        raw
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Quote, CoreError> {
        let resp = self
            .bounded(
                format!("Failed to fetch latest quote for {symbol}"),
                self.connector.get_latest_quotes(symbol, "1d"),
            )
            .await?;

        let quote = resp.last_quote().map_err(|e| CoreError::ProviderError {
            provider: PROVIDER.into(),
            message: format!("No quote data for {symbol}: {e}"),
        })?;

        let reported: Option<String> = resp.metadata().ok().and_then(|m| m.currency.clone().into());
        Ok(Quote::new(
            self.correct_price(quote.close),
            self.quote_currency(reported),
        ))
    }

    async fn get_historical_close(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Quote, CoreError> {
        // A week back covers weekends and multi-day holidays
        let start = Self::to_offset_datetime(date - chrono::Duration::days(HISTORICAL_LOOKBACK_DAYS))?;
        let end = Self::to_offset_datetime(date + chrono::Duration::days(1))?;

        let resp = self
            .bounded(
                format!("Failed to fetch history for {symbol} on {date}"),
                self.connector.get_quote_history(symbol, start, end),
            )
            .await?;

        let quotes = resp.quotes().map_err(|e| CoreError::ProviderError {
            provider: PROVIDER.into(),
            message: format!("Failed to parse quotes for {symbol}: {e}"),
        })?;

        let (traded_on, close) = close_on_or_before(quotes.iter().map(|q| (q.timestamp, q.close)), date)
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: symbol.to_string(),
                currency: "native".to_string(),
                date: date.to_string(),
            })?;

        let reported: Option<String> = resp.metadata().ok().and_then(|m| m.currency.clone().into());
        tracing::debug!(symbol, %date, %traded_on, close, "historical close fetched");
        Ok(Quote::new(
            self.correct_price(close),
            self.quote_currency(reported),
        ))
    }

    async fn get_price_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let start = Self::to_offset_datetime(from)?;
        let end = Self::to_offset_datetime(to + chrono::Duration::days(1))?; // inclusive end

        let resp = self
            .bounded(
                format!("Failed to fetch history range for {symbol}"),
                self.connector.get_quote_history(symbol, start, end),
            )
            .await?;

        let quotes = resp.quotes().map_err(|e| CoreError::ProviderError {
            provider: PROVIDER.into(),
            message: format!("Failed to parse quotes for {symbol}: {e}"),
        })?;

        let mut points: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                let date = Self::timestamp_to_naive_date(q.timestamp)?;
                if date >= from && date <= to {
                    Some(PricePoint {
                        date,
                        price: self.correct_price(q.close),
                    })
                } else {
                    None
                }
            })
            .collect();

        points.sort_by_key(|p| p.date);
        Ok(points)
    }

    async fn get_company_profile(&self, symbol: &str) -> Result<CompanyProfile, CoreError> {
        let result = self
            .bounded(
                format!("Failed to search for {symbol}"),
                self.connector.search_ticker(symbol),
            )
            .await?;

        let item = result
            .quotes
            .iter()
            .find(|q| {
                let found: Option<String> = q.symbol.clone().into();
                found.is_some_and(|s| s.eq_ignore_ascii_case(symbol))
            })
            .ok_or_else(|| CoreError::ProviderError {
                provider: PROVIDER.into(),
                message: format!("No company found for {symbol}"),
            })?;

        Ok(CompanyProfile {
            symbol: symbol.to_uppercase(),
            short_name: item.short_name.clone().into(),
            long_name: item.long_name.clone().into(),
            exchange: item.exchange.clone().into(),
            quote_type: item.quote_type.clone().into(),
            fetched_on: chrono::Utc::now().date_naive(),
        })
    }
}
