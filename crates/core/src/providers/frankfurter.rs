use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;
use super::traits::FxRateProvider;

const BASE_URL: &str = "https://api.frankfurter.dev/v1";

/// Frankfurter API provider for fiat currency exchange rates.
///
/// - **Free**: No API key, no rate limits, open-source.
/// - **Source**: European Central Bank (ECB) data.
/// - **Coverage**: ~30 currencies (EUR, USD, ZAR, GBP, JPY, etc.)
/// - **Endpoints**: `/latest`, `/{date}`
///
/// Dates without an ECB fixing (weekends, holidays) resolve to the
/// previous working day on the server side.
pub struct FrankfurterProvider {
    client: Client,
    base_url: String,
}

impl FrankfurterProvider {
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(BASE_URL, timeout)
    }

    /// Point the provider at another Frankfurter instance (self-hosted or a test server).
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn rate_url(&self, base: &str, target: &str, date: Option<NaiveDate>) -> String {
        let path = match date {
            Some(d) => d.format("%Y-%m-%d").to_string(),
            None => "latest".to_string(),
        };
        format!("{}/{path}?base={base}&symbols={target}", self.base_url)
    }
}

// ── Frankfurter API response types ──────────────────────────────────

#[derive(Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

#[async_trait]
impl FxRateProvider for FrankfurterProvider {
    fn name(&self) -> &str {
        "Frankfurter"
    }

    async fn get_rate(
        &self,
        from: &str,
        to: &str,
        date: Option<NaiveDate>,
    ) -> Result<f64, CoreError> {
        let base = from.to_uppercase();
        let target = to.to_uppercase();

        // Same currency → rate is 1.0
        if base == target {
            return Ok(1.0);
        }

        let url = self.rate_url(&base, &target, date);
        tracing::debug!(%url, "fetching FX rate");

        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(CoreError::ProviderError {
                provider: "Frankfurter".into(),
                message: format!("HTTP {} for {base}/{target}", resp.status()),
            });
        }

        let body: RatesResponse = resp.json().await.map_err(|e| CoreError::ProviderError {
            provider: "Frankfurter".into(),
            message: format!("Failed to parse response for {base}/{target}: {e}"),
        })?;

        body.rates
            .get(&target)
            .copied()
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: base.clone(),
                currency: target.clone(),
                date: date.map_or_else(|| "latest".to_string(), |d| d.to_string()),
            })
    }
}
