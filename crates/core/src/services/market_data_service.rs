use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::company::CompanyProfile;
use crate::models::price::{PricePoint, Quote};
use crate::providers::registry::ProviderRegistry;

/// Fetches quotes, FX rates and company data from the registered providers.
///
/// Providers are asked in registration order; the first successful answer
/// wins. Each provider is asked at most once per call. Prices and rates
/// must be finite and strictly positive, otherwise the answer is treated as
/// a provider failure and the next provider is tried.
pub struct MarketDataService {
    registry: ProviderRegistry,
}

impl MarketDataService {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Names of the market-data providers, in fallback order.
    pub fn market_provider_names(&self) -> Vec<String> {
        self.registry
            .market_providers()
            .map(|p| p.name().to_string())
            .collect()
    }

    pub async fn current_price(&self, symbol: &str) -> Result<Quote, CoreError> {
        let mut last_error = None;
        for provider in self.registry.market_providers() {
            match provider.get_current_price(symbol).await {
                Ok(quote) => match validate_quote(provider.name(), symbol, quote) {
                    Ok(quote) => return Ok(quote),
                    Err(e) => last_error = Some(e),
                },
                Err(e) => {
                    tracing::warn!(provider = provider.name(), symbol, "current price failed: {e}");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| CoreError::NoProvider("market data".into())))
    }

    pub async fn historical_close(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Quote, CoreError> {
        let mut last_error = None;
        for provider in self.registry.market_providers() {
            match provider.get_historical_close(symbol, date).await {
                Ok(quote) => match validate_quote(provider.name(), symbol, quote) {
                    Ok(quote) => return Ok(quote),
                    Err(e) => last_error = Some(e),
                },
                Err(e) => {
                    tracing::warn!(provider = provider.name(), symbol, %date, "historical close failed: {e}");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| CoreError::NoProvider("market data".into())))
    }

    pub async fn price_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let mut last_error = None;
        for provider in self.registry.market_providers() {
            match provider.get_price_history(symbol, from, to).await {
                Ok(points) => {
                    // Drop rows the provider could not price (Yahoo reports NaN on halts)
                    let valid: Vec<PricePoint> = points
                        .into_iter()
                        .filter(|p| p.price.is_finite() && p.price > 0.0)
                        .collect();
                    return Ok(valid);
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), symbol, "price history failed: {e}");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| CoreError::NoProvider("market data".into())))
    }

    pub async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, CoreError> {
        let mut last_error = None;
        for provider in self.registry.market_providers() {
            match provider.get_company_profile(symbol).await {
                Ok(profile) => return Ok(profile),
                Err(e) => {
                    tracing::warn!(provider = provider.name(), symbol, "company profile failed: {e}");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| CoreError::NoProvider("market data".into())))
    }

    /// Rate converting one unit of `from` into `to`; `None` means latest.
    pub async fn fx_rate(
        &self,
        from: &str,
        to: &str,
        date: Option<NaiveDate>,
    ) -> Result<f64, CoreError> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(1.0);
        }

        let mut last_error = None;
        for provider in self.registry.fx_providers() {
            match provider.get_rate(from, to, date).await {
                Ok(rate) if rate.is_finite() && rate > 0.0 => return Ok(rate),
                Ok(rate) => {
                    last_error = Some(CoreError::ProviderError {
                        provider: provider.name().to_string(),
                        message: format!("Invalid rate returned for {from}/{to}: {rate}"),
                    });
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), from, to, "FX rate failed: {e}");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| CoreError::NoProvider("FX rates".into())))
    }
}

/// Reject prices that no valuation should ever see.
fn validate_quote(provider: &str, symbol: &str, quote: Quote) -> Result<Quote, CoreError> {
    if !quote.price.is_finite() || quote.price <= 0.0 {
        return Err(CoreError::ProviderError {
            provider: provider.to_string(),
            message: format!(
                "Invalid price returned for {symbol}: {} (must be finite and positive)",
                quote.price
            ),
        });
    }
    Ok(quote)
}
