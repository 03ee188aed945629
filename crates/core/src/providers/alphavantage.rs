use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::company::CompanyProfile;
use crate::models::price::{PricePoint, Quote};
use super::traits::MarketDataProvider;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "Alpha Vantage";

/// Calendar days safely inside the compact series (last 100 trading days).
const COMPACT_WINDOW_DAYS: i64 = 120;

/// A series may start this many days after the requested date when the
/// requested date itself was not a session.
const SESSION_GAP_DAYS: i64 = 4;

/// Alpha Vantage API provider for stock/equity prices.
///
/// - **Free tier**: 25 requests/day (across ALL endpoints).
/// - **Requires**: API key (set in the config file as `api_keys.alphavantage`).
/// - **Coverage**: 100k+ global equity symbols.
///
/// Registered after Yahoo Finance as a fallback. Daily series use the
/// compact variant (last 100 trading days) when it reaches back far
/// enough and the full history otherwise.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, api_key }
    }

    fn api_error(message: String) -> CoreError {
        CoreError::ProviderError {
            provider: PROVIDER.into(),
            message,
        }
    }

    async fn query<T: serde::de::DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, CoreError> {
        let resp = self
            .client
            .get(BASE_URL)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::api_error(format!("HTTP {}", resp.status())));
        }
        resp.json()
            .await
            .map_err(|e| Self::api_error(format!("Failed to parse response: {e}")))
    }

    /// Fetch the daily time series for a stock symbol.
    async fn fetch_daily_series(
        &self,
        symbol: &str,
        size: OutputSize,
    ) -> Result<HashMap<String, DailyData>, CoreError> {
        let upper = symbol.to_uppercase();
        let resp: TimeSeriesResponse = self
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", upper.as_str()),
                ("outputsize", size.as_str()),
            ])
            .await?;

        resp.time_series.ok_or_else(|| {
            Self::api_error(format!(
                "No time series data for {symbol}. API limit may be exceeded."
            ))
        })
    }

    fn series_points(series: &HashMap<String, DailyData>) -> Vec<PricePoint> {
        let mut points: Vec<PricePoint> = series
            .iter()
            .filter_map(|(date_str, data)| {
                let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
                let price: f64 = data.close.parse().ok()?;
                Some(PricePoint { date, price })
            })
            .collect();
        points.sort_by_key(|p| p.date);
        points
    }

    /// Points between `from` and `to` inclusive.
    ///
    /// A compact series that starts after `from` cannot answer the range and
    /// is reported as missing rather than truncated.
    fn points_in_range(
        symbol: &str,
        series: &HashMap<String, DailyData>,
        from: NaiveDate,
        to: NaiveDate,
        size: OutputSize,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let points = Self::series_points(series);
        let covered = points
            .first()
            .is_some_and(|p| p.date <= from + chrono::Duration::days(SESSION_GAP_DAYS));
        if size == OutputSize::Compact && !covered {
            return Err(CoreError::PriceNotAvailable {
                symbol: symbol.to_string(),
                currency: "native".to_string(),
                date: from.to_string(),
            });
        }
        Ok(points
            .into_iter()
            .filter(|p| p.date >= from && p.date <= to)
            .collect())
    }

    /// Alpha Vantage does not tag prices with a currency; the listing's
    /// currency comes from SYMBOL_SEARCH.
    async fn listing_currency(&self, symbol: &str) -> Result<String, CoreError> {
        let best = self.search(symbol).await?;
        best.and_then(|m| m.currency)
            .map(|c| c.to_uppercase())
            .ok_or_else(|| Self::api_error(format!("No listing currency for {symbol}")))
    }

    async fn search(&self, symbol: &str) -> Result<Option<SearchMatch>, CoreError> {
        let resp: SearchResponse = self
            .query(&[("function", "SYMBOL_SEARCH"), ("keywords", symbol)])
            .await?;
        Ok(resp
            .best_matches
            .unwrap_or_default()
            .into_iter()
            .find(|m| m.symbol.eq_ignore_ascii_case(symbol)))
    }
}

/// Length of the daily series requested from TIME_SERIES_DAILY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputSize {
    Compact,
    Full,
}

impl OutputSize {
    /// Smallest series that reaches back to `oldest`.
    fn reaching(oldest: NaiveDate, today: NaiveDate) -> Self {
        if (today - oldest).num_days() <= COMPACT_WINDOW_DAYS {
            OutputSize::Compact
        } else {
            OutputSize::Full
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        }
    }
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
}

#[derive(Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
}

#[derive(Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyData>>,
}

#[derive(Deserialize)]
struct DailyData {
    #[serde(rename = "4. close")]
    close: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(rename = "bestMatches")]
    best_matches: Option<Vec<SearchMatch>>,
}

#[derive(Deserialize)]
struct SearchMatch {
    #[serde(rename = "1. symbol")]
    symbol: String,
    #[serde(rename = "2. name")]
    name: Option<String>,
    #[serde(rename = "3. type")]
    kind: Option<String>,
    #[serde(rename = "4. region")]
    region: Option<String>,
    #[serde(rename = "8. currency")]
    currency: Option<String>,
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Quote, CoreError> {
        let upper = symbol.to_uppercase();
        let resp: GlobalQuoteResponse = self
            .query(&[("function", "GLOBAL_QUOTE"), ("symbol", upper.as_str())])
            .await?;

        let price_str = resp
            .global_quote
            .and_then(|q| q.price)
            .ok_or_else(|| {
                Self::api_error(format!("No quote data for {symbol}. API limit may be exceeded."))
            })?;

        let price: f64 = price_str
            .parse()
            .map_err(|e| Self::api_error(format!("Invalid price format for {symbol}: {e}")))?;

        let currency = self.listing_currency(symbol).await?;
        Ok(Quote::new(price, currency))
    }

    async fn get_historical_close(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Quote, CoreError> {
        let series = self
            .fetch_daily_series(symbol, OutputSize::reaching(date, today()))
            .await?;

        // Latest trading day on or before the purchase date
        let point = Self::series_points(&series)
            .into_iter()
            .rev()
            .find(|p| p.date <= date)
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: symbol.to_string(),
                currency: "native".to_string(),
                date: date.to_string(),
            })?;

        let currency = self.listing_currency(symbol).await?;
        Ok(Quote::new(point.price, currency))
    }

    async fn get_price_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let size = OutputSize::reaching(from, today());
        let series = self.fetch_daily_series(symbol, size).await?;
        Self::points_in_range(symbol, &series, from, to, size)
    }

    async fn get_company_profile(&self, symbol: &str) -> Result<CompanyProfile, CoreError> {
        let found = self
            .search(symbol)
            .await?
            .ok_or_else(|| Self::api_error(format!("No company found for {symbol}")))?;

        Ok(CompanyProfile {
            symbol: symbol.to_uppercase(),
            short_name: None,
            long_name: found.name,
            exchange: found.region,
            quote_type: found.kind,
            fetched_on: chrono::Utc::now().date_naive(),
        })
    }
}
