use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single buy transaction, exactly as stored in the ledger file.
///
/// Field names follow the on-disk format:
/// `{ "date": "2024-01-10", "quantity": 10.0, "unitPrice": 100.0, "currency": "USD" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    /// Date of the purchase (daily granularity, no time component)
    pub date: NaiveDate,

    /// Number of shares acquired (always positive)
    pub quantity: f64,

    /// Price paid per share, in `currency`
    pub unit_price: f64,

    /// ISO 4217 code of the purchase currency, upper-case
    pub currency: String,
}

impl PurchaseRecord {
    pub fn new(
        date: NaiveDate,
        quantity: f64,
        unit_price: f64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            date,
            quantity,
            unit_price,
            currency: currency.into().to_uppercase(),
        }
    }

    /// Total amount paid for this purchase, in the purchase currency.
    #[must_use]
    pub fn total_paid(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

/// Caller input for recording a purchase.
///
/// Any one of `quantity`, `unit_price` and `total_paid` may be left out
/// as long as it can be derived from the other two. A missing unit price
/// can also come from the historical close on `date`.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRequest {
    pub date: NaiveDate,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub total_paid: Option<f64>,
    pub currency: Option<String>,
}

impl PurchaseRequest {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            quantity: None,
            unit_price: None,
            total_paid: None,
            currency: None,
        }
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_unit_price(mut self, unit_price: f64) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    pub fn with_total_paid(mut self, total_paid: f64) -> Self {
        self.total_paid = Some(total_paid);
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// True when the unit price can only come from a market-data lookup:
    /// the quantity is known but neither the price nor the total paid is.
    #[must_use]
    pub fn needs_historical_close(&self) -> bool {
        self.quantity.is_some() && self.unit_price.is_none() && self.total_paid.is_none()
    }
}
