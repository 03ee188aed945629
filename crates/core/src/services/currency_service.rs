use std::collections::BTreeSet;

use crate::errors::CoreError;
use crate::models::purchase::PurchaseRecord;
use crate::models::valuation::{FxPolicy, FxRates};
use super::market_data_service::MarketDataService;

/// Gathers the exchange rates a valuation needs, before any arithmetic.
///
/// The valuation model is pure: it only reads an `FxRates` table. This
/// service fills that table from the FX providers, asking only for the
/// currencies and dates that actually occur:
/// - a spot rate for the current quote's currency,
/// - per `FxPolicy::PurchaseDate`, one historical rate per distinct
///   (purchase currency, purchase date),
/// - per `FxPolicy::Spot`, one spot rate per distinct purchase currency.
///
/// Conversions into the display currency itself are never fetched.
pub struct CurrencyService;

impl CurrencyService {
    pub fn new() -> Self {
        Self
    }

    pub async fn collect_rates(
        &self,
        market: &MarketDataService,
        records: &[PurchaseRecord],
        quote_currency: Option<&str>,
        display_currency: &str,
        policy: FxPolicy,
    ) -> Result<FxRates, CoreError> {
        let display = display_currency.to_uppercase();
        let mut rates = FxRates::new(&display);

        let mut spot_currencies: BTreeSet<String> = BTreeSet::new();
        if let Some(currency) = quote_currency {
            spot_currencies.insert(currency.to_uppercase());
        }

        match policy {
            FxPolicy::PurchaseDate => {
                let needed: BTreeSet<(String, chrono::NaiveDate)> = records
                    .iter()
                    .filter(|r| r.currency != display)
                    .map(|r| (r.currency.clone(), r.date))
                    .collect();
                for (currency, date) in needed {
                    let rate = market.fx_rate(&currency, &display, Some(date)).await?;
                    rates.set_historical(&currency, date, rate);
                }
            }
            FxPolicy::Spot => {
                spot_currencies.extend(records.iter().map(|r| r.currency.clone()));
            }
        }

        for currency in spot_currencies.into_iter().filter(|c| *c != display) {
            let rate = market.fx_rate(&currency, &display, None).await?;
            rates.set_spot(&currency, rate);
        }

        Ok(rates)
    }
}

impl Default for CurrencyService {
    fn default() -> Self {
        Self::new()
    }
}
