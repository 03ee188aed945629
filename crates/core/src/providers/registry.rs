use crate::models::settings::Settings;

use super::alphavantage::AlphaVantageProvider;
use super::frankfurter::FrankfurterProvider;
use super::traits::{FxRateProvider, MarketDataProvider};
use super::yahoo_finance::YahooFinanceProvider;

/// Registry of all available market-data and FX providers.
///
/// Providers are tried in registration order; later ones are fallbacks.
pub struct ProviderRegistry {
    market: Vec<Box<dyn MarketDataProvider>>,
    fx: Vec<Box<dyn FxRateProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            market: Vec::new(),
            fx: Vec::new(),
        }
    }

    /// Create a registry with all default providers configured for `ticker`.
    pub fn new_with_defaults(settings: &Settings, ticker: &str) -> Self {
        let mut registry = Self::new();
        let timeout = settings.http_timeout();

        // Yahoo Finance: stocks, NO API key needed (primary)
        match YahooFinanceProvider::new(timeout) {
            Ok(yahoo) => {
                registry.register_market(Box::new(
                    yahoo.with_jse_correction(settings.is_jse(ticker)),
                ));
            }
            Err(e) => tracing::warn!("Yahoo Finance unavailable: {e}"),
        }

        // Alpha Vantage: stocks, requires API key (fallback).
        // Its prices are never in cents, so it cannot stand in for JSE tickers.
        if let Some(key) = settings.api_keys.get("alphavantage") {
            if !settings.is_jse(ticker) {
                registry.register_market(Box::new(AlphaVantageProvider::new(key.clone(), timeout)));
            }
        }

        // Frankfurter: FX, no API key needed
        registry.register_fx(Box::new(FrankfurterProvider::new(timeout)));

        registry
    }

    /// Register a market-data provider after the existing ones.
    pub fn register_market(&mut self, provider: Box<dyn MarketDataProvider>) {
        self.market.push(provider);
    }

    /// Register an FX provider after the existing ones.
    pub fn register_fx(&mut self, provider: Box<dyn FxRateProvider>) {
        self.fx.push(provider);
    }

    /// All market-data providers, ordered by registration priority.
    pub fn market_providers(&self) -> impl Iterator<Item = &dyn MarketDataProvider> {
        self.market.iter().map(|p| p.as_ref())
    }

    /// All FX providers, ordered by registration priority.
    pub fn fx_providers(&self) -> impl Iterator<Item = &dyn FxRateProvider> {
        self.fx.iter().map(|p| p.as_ref())
    }

    #[must_use]
    pub fn has_market_provider(&self) -> bool {
        !self.market.is_empty()
    }

    #[must_use]
    pub fn has_fx_provider(&self) -> bool {
        !self.fx.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
