use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single price data point (date → closing price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// A price tagged with the currency it is quoted in.
///
/// Market-data providers return these; the valuation model converts
/// them to the display currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub currency: String,
}

impl Quote {
    pub fn new(price: f64, currency: impl Into<String>) -> Self {
        Self {
            price,
            currency: currency.into().to_uppercase(),
        }
    }
}
