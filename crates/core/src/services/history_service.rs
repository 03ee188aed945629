use chrono::NaiveDate;
use std::path::PathBuf;

use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::storage::layout::StorageLayout;
use crate::storage::manager::StorageManager;
use super::market_data_service::MarketDataService;

/// Maximum price-history range in days (10 years).
pub const MAX_HISTORY_RANGE_DAYS: i64 = 3650;

/// Fetches daily closes and saves them as `history.csv` in the ticker
/// directory, for plotting in whatever tool the user prefers.
pub struct HistoryService {
    layout: StorageLayout,
}

impl HistoryService {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// Fetch `[from, to]` and replace the ticker's history file.
    /// Returns the file path and the fetched points.
    pub async fn export_price_history(
        &self,
        market: &MarketDataService,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<(PathBuf, Vec<PricePoint>), CoreError> {
        validate_range(from, to)?;

        let points = market.price_history(ticker, from, to).await?;
        let path = self.layout.history_path(ticker)?;
        StorageManager::save_price_history(&path, &points)?;

        tracing::info!(ticker, rows = points.len(), path = %path.display(), "price history exported");
        Ok((path, points))
    }
}

pub fn validate_range(from: NaiveDate, to: NaiveDate) -> Result<(), CoreError> {
    if from > to {
        return Err(CoreError::ValidationError(format!(
            "'from' date ({from}) must not be after 'to' date ({to})"
        )));
    }
    let range_days = (to - from).num_days();
    if range_days > MAX_HISTORY_RANGE_DAYS {
        return Err(CoreError::ValidationError(format!(
            "History range of {range_days} days exceeds maximum of {MAX_HISTORY_RANGE_DAYS} days (10 years)"
        )));
    }
    Ok(())
}
