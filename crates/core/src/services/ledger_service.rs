use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::currency::normalize_currency;
use crate::models::ledger::Ledger;
use crate::models::price::Quote;
use crate::models::purchase::{PurchaseRecord, PurchaseRequest};
use crate::storage::layout::StorageLayout;
use crate::storage::manager::StorageManager;

/// Absolute slack allowed between a stated total and quantity × unit price
/// (half a cent).
pub const TOTAL_PAID_ABS_TOLERANCE: f64 = 0.005;

/// Relative slack allowed between a stated total and quantity × unit price.
pub const TOTAL_PAID_REL_TOLERANCE: f64 = 1e-6;

/// Records purchases and reads them back. Holds no market-data client:
/// a unit price that has to come from the market is passed in by the
/// caller as `historical_close`.
pub struct LedgerService {
    layout: StorageLayout,
}

impl LedgerService {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    #[must_use]
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Read the persisted ledger of `ticker`.
    /// A ticker that was never tracked yields an empty ledger.
    pub fn load_ledger(&self, ticker: &str) -> Result<Ledger, CoreError> {
        let path = self.layout.ledger_path(ticker)?;
        let records = StorageManager::load_ledger(&path)?;
        Ok(Ledger::from_records(ticker, records))
    }

    /// Validate `request`, derive the missing field, append the record and
    /// persist the whole ledger before returning.
    ///
    /// If persisting fails, `ledger` is left exactly as it was.
    pub fn record_purchase(
        &self,
        ledger: &mut Ledger,
        request: &PurchaseRequest,
        historical_close: Option<&Quote>,
        display_currency: &str,
        today: NaiveDate,
    ) -> Result<PurchaseRecord, CoreError> {
        let record = resolve_purchase(request, historical_close, display_currency, today)?;

        let next = ledger.appended(record.clone());
        let path = self.layout.ledger_path(&ledger.ticker)?;
        StorageManager::save_ledger(&path, &next)?;
        ledger.replace_records(next);

        tracing::info!(
            ticker = %ledger.ticker,
            date = %record.date,
            quantity = record.quantity,
            unit_price = record.unit_price,
            currency = %record.currency,
            "purchase recorded"
        );
        Ok(record)
    }
}

/// Turn a purchase request into a complete record.
///
/// Derivation rules, in order:
/// - quantity and unit price given: a stated total must agree with them.
/// - quantity and total given: unit price = total / quantity.
/// - quantity only: unit price = `historical_close`, whose currency becomes
///   the record's currency.
/// - unit price and total given: quantity = total / unit price.
/// - anything else is ambiguous.
pub fn resolve_purchase(
    request: &PurchaseRequest,
    historical_close: Option<&Quote>,
    display_currency: &str,
    today: NaiveDate,
) -> Result<PurchaseRecord, CoreError> {
    if request.date > today {
        return Err(CoreError::ValidationError(format!(
            "Purchase date {} is in the future",
            request.date
        )));
    }

    check_positive("quantity", request.quantity)?;
    check_positive("unit price", request.unit_price)?;
    check_positive("total paid", request.total_paid)?;

    let requested_currency = request
        .currency
        .as_deref()
        .map(normalize_currency)
        .transpose()?;

    let (quantity, unit_price, currency) =
        match (request.quantity, request.unit_price, request.total_paid) {
            (Some(q), Some(p), total) => {
                if let Some(t) = total {
                    check_total(q, p, t)?;
                }
                (q, p, requested_currency)
            }
            (Some(q), None, Some(t)) => (q, t / q, requested_currency),
            (Some(q), None, None) => {
                let close = historical_close.ok_or_else(|| {
                    CoreError::ValidationError(format!(
                        "No unit price or total given and no closing price available for {}",
                        request.date
                    ))
                })?;
                check_positive("closing price", Some(close.price))?;
                let quote_currency = normalize_currency(&close.currency)?;
                if let Some(wanted) = &requested_currency {
                    if *wanted != quote_currency {
                        return Err(CoreError::ValidationError(format!(
                            "Purchase currency {wanted} differs from the quote currency {quote_currency}; \
                             give a unit price or total in {wanted}"
                        )));
                    }
                }
                tracing::debug!(date = %request.date, close = close.price, "unit price taken from historical close");
                (q, close.price, Some(quote_currency))
            }
            (None, Some(p), Some(t)) => (t / p, p, requested_currency),
            (None, Some(_), None) => {
                return Err(CoreError::ValidationError(
                    "Quantity cannot be derived: give a quantity or the total paid".into(),
                ))
            }
            (None, None, _) => {
                return Err(CoreError::ValidationError(
                    "Ambiguous purchase: give a quantity or a unit price".into(),
                ))
            }
        };

    // Derived values can still underflow or overflow
    check_positive("quantity", Some(quantity))?;
    check_positive("unit price", Some(unit_price))?;

    let currency = match currency {
        Some(c) => c,
        None => normalize_currency(display_currency)?,
    };

    Ok(PurchaseRecord {
        date: request.date,
        quantity,
        unit_price,
        currency,
    })
}

fn check_positive(field: &str, value: Option<f64>) -> Result<(), CoreError> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => Err(CoreError::ValidationError(format!(
            "{field} must be a positive number, got {v}"
        ))),
        _ => Ok(()),
    }
}

fn check_total(quantity: f64, unit_price: f64, total_paid: f64) -> Result<(), CoreError> {
    let expected = quantity * unit_price;
    let tolerance = (expected.abs() * TOTAL_PAID_REL_TOLERANCE).max(TOTAL_PAID_ABS_TOLERANCE);
    if (expected - total_paid).abs() > tolerance {
        return Err(CoreError::ValidationError(format!(
            "Total paid {total_paid} does not match {quantity} × {unit_price} = {expected}"
        )));
    }
    Ok(())
}
