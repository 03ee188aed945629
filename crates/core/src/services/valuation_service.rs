use crate::errors::CoreError;
use crate::models::price::Quote;
use crate::models::purchase::PurchaseRecord;
use crate::models::valuation::{FxPolicy, FxRates, Holdings, ValuationSnapshot};

/// Computes holdings and valuation metrics from a ledger snapshot.
///
/// Pure business logic: no I/O, no API calls. Every input the numbers
/// depend on (records, current quote, exchange rates) is a parameter,
/// and every currency conversion happens here.
pub struct ValuationService;

impl ValuationService {
    pub fn new() -> Self {
        Self
    }

    /// Total shares and total cost (in the display currency) of `records`.
    ///
    /// Each purchase's cost is converted with the rate chosen by `policy`.
    pub fn current_holdings(
        &self,
        records: &[PurchaseRecord],
        fx: &FxRates,
        policy: FxPolicy,
    ) -> Result<Holdings, CoreError> {
        let mut total_shares = 0.0;
        let mut total_cost = 0.0;

        for record in records {
            let rate = fx.cost_rate(&record.currency, record.date, policy)?;
            total_shares += record.quantity;
            total_cost += record.quantity * record.unit_price * rate;
        }

        Ok(Holdings {
            total_shares,
            total_cost,
            currency: fx.display_currency().to_string(),
        })
    }

    /// Holdings of `records` valued at `current_price`.
    pub fn valuation_snapshot(
        &self,
        records: &[PurchaseRecord],
        current_price: &Quote,
        fx: &FxRates,
        policy: FxPolicy,
    ) -> Result<ValuationSnapshot, CoreError> {
        let holdings = self.current_holdings(records, fx, policy)?;
        self.snapshot_from_holdings(&holdings, current_price, fx)
    }

    /// Value already-aggregated holdings at `current_price`.
    /// The price is converted to the display currency at the spot rate.
    pub fn snapshot_from_holdings(
        &self,
        holdings: &Holdings,
        current_price: &Quote,
        fx: &FxRates,
    ) -> Result<ValuationSnapshot, CoreError> {
        let price = current_price.price * fx.spot_rate(&current_price.currency)?;

        Ok(ValuationSnapshot {
            total_shares: holdings.total_shares,
            total_cost: holdings.total_cost,
            current_price: price,
            current_value: holdings.total_shares * price,
            currency: fx.display_currency().to_string(),
        })
    }

    /// Whether the current price is at least `discount_threshold` below the
    /// average purchase price: `price <= average × (1 − threshold)`.
    ///
    /// `discount_threshold` must lie in `[0, 1)`.
    pub fn is_discount_to_average(
        &self,
        records: &[PurchaseRecord],
        current_price: &Quote,
        fx: &FxRates,
        policy: FxPolicy,
        discount_threshold: f64,
    ) -> Result<bool, CoreError> {
        validate_threshold(discount_threshold)?;

        let snapshot = self.valuation_snapshot(records, current_price, fx, policy)?;
        let average = snapshot.average_unit_cost()?;
        Ok(snapshot.current_price <= average * (1.0 - discount_threshold))
    }
}

impl Default for ValuationService {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_threshold(threshold: f64) -> Result<(), CoreError> {
    // NaN fails the range check too
    if !(0.0..1.0).contains(&threshold) {
        return Err(CoreError::ValidationError(format!(
            "Discount threshold must be in [0, 1), got {threshold}"
        )));
    }
    Ok(())
}
