use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::CoreError;

/// Which FX rate converts a purchase's cost into the display currency.
///
/// The current price is always converted at the spot rate; only the cost
/// side of the valuation depends on this policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FxPolicy {
    /// Each purchase converted at the rate of its own purchase date
    #[default]
    PurchaseDate,
    /// Every purchase converted at today's rate
    Spot,
}

impl std::fmt::Display for FxPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FxPolicy::PurchaseDate => write!(f, "purchase_date"),
            FxPolicy::Spot => write!(f, "spot"),
        }
    }
}

/// Exchange rates into one display currency.
///
/// Rates are multipliers: `amount_in_display = amount * rate`.
/// Converting the display currency into itself is always 1.0 and needs
/// no entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FxRates {
    display_currency: String,
    spot: HashMap<String, f64>,
    historical: HashMap<(String, NaiveDate), f64>,
}

impl FxRates {
    pub fn new(display_currency: impl Into<String>) -> Self {
        Self {
            display_currency: display_currency.into().to_uppercase(),
            spot: HashMap::new(),
            historical: HashMap::new(),
        }
    }

    #[must_use]
    pub fn display_currency(&self) -> &str {
        &self.display_currency
    }

    pub fn set_spot(&mut self, from: &str, rate: f64) {
        self.spot.insert(from.to_uppercase(), rate);
    }

    pub fn with_spot(mut self, from: &str, rate: f64) -> Self {
        self.set_spot(from, rate);
        self
    }

    pub fn set_historical(&mut self, from: &str, date: NaiveDate, rate: f64) {
        self.historical.insert((from.to_uppercase(), date), rate);
    }

    pub fn with_historical(mut self, from: &str, date: NaiveDate, rate: f64) -> Self {
        self.set_historical(from, date, rate);
        self
    }

    /// Current rate from `from` into the display currency.
    pub fn spot_rate(&self, from: &str) -> Result<f64, CoreError> {
        let from = from.to_uppercase();
        if from == self.display_currency {
            return Ok(1.0);
        }
        self.spot
            .get(&from)
            .copied()
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: from,
                currency: self.display_currency.clone(),
                date: "spot".into(),
            })
    }

    /// Rate from `from` into the display currency on `date`.
    pub fn historical_rate(&self, from: &str, date: NaiveDate) -> Result<f64, CoreError> {
        let from = from.to_uppercase();
        if from == self.display_currency {
            return Ok(1.0);
        }
        let key = (from, date);
        self.historical
            .get(&key)
            .copied()
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: key.0.clone(),
                currency: self.display_currency.clone(),
                date: date.to_string(),
            })
    }

    /// Rate used for the cost of a purchase made on `date`, according to `policy`.
    pub fn cost_rate(
        &self,
        from: &str,
        date: NaiveDate,
        policy: FxPolicy,
    ) -> Result<f64, CoreError> {
        match policy {
            FxPolicy::PurchaseDate => self.historical_rate(from, date),
            FxPolicy::Spot => self.spot_rate(from),
        }
    }
}

/// Aggregate position of a ticker, in the display currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holdings {
    /// Sum of all purchased quantities
    pub total_shares: f64,

    /// Sum of quantity × unit price, converted to `currency`
    pub total_cost: f64,

    /// Display currency of `total_cost`
    pub currency: String,
}

impl Holdings {
    /// Average price paid per share.
    ///
    /// Fails with `InsufficientData` when no shares are held.
    pub fn average_unit_cost(&self) -> Result<f64, CoreError> {
        if self.total_shares == 0.0 {
            return Err(CoreError::InsufficientData(
                "average unit cost is undefined without any shares".into(),
            ));
        }
        Ok(self.total_cost / self.total_shares)
    }
}

/// Holdings combined with the current market price. Derived on demand,
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSnapshot {
    pub total_shares: f64,
    pub total_cost: f64,

    /// Current price per share, converted to `currency`
    pub current_price: f64,

    /// total_shares × current_price
    pub current_value: f64,

    /// Display currency of every monetary field
    pub currency: String,
}

impl ValuationSnapshot {
    /// Return on investment: (current value − total cost) / total cost.
    ///
    /// Fails with `InsufficientData` when nothing was paid, instead of
    /// producing NaN or infinity.
    pub fn roi(&self) -> Result<f64, CoreError> {
        if self.total_cost == 0.0 {
            return Err(CoreError::InsufficientData(
                "return on investment is undefined for a zero total cost".into(),
            ));
        }
        Ok((self.current_value - self.total_cost) / self.total_cost)
    }

    pub fn average_unit_cost(&self) -> Result<f64, CoreError> {
        self.holdings().average_unit_cost()
    }

    /// Absolute profit (positive) or loss (negative).
    #[must_use]
    pub fn gain_loss(&self) -> f64 {
        self.current_value - self.total_cost
    }

    #[must_use]
    pub fn holdings(&self) -> Holdings {
        Holdings {
            total_shares: self.total_shares,
            total_cost: self.total_cost,
            currency: self.currency.clone(),
        }
    }
}
