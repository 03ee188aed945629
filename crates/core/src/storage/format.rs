use crate::errors::CoreError;
use crate::models::currency::normalize_currency;
use crate::models::price::PricePoint;
use crate::models::purchase::PurchaseRecord;

/// Header row of the exported price history.
pub const HISTORY_CSV_HEADER: &str = "date,close";

/// Header row of the exported purchase list.
pub const PURCHASES_CSV_HEADER: &str = "date,quantity,unit_price,currency,total";

/// Serialize a ledger to its on-disk document.
///
/// Layout: a pretty-printed JSON array, oldest purchase first.
/// ```text
/// [
///   { "date": "2024-01-10", "quantity": 10.0, "unitPrice": 100.0, "currency": "USD" }
/// ]
/// ```
pub fn encode_ledger(records: &[PurchaseRecord]) -> Result<Vec<u8>, CoreError> {
    let mut bytes = serde_json::to_vec_pretty(records)
        .map_err(|e| CoreError::Serialization(format!("Failed to serialize ledger: {e}")))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse a ledger document.
///
/// Anything that is not a JSON array of well-formed records is a
/// `StorageError`: the file exists but cannot be trusted.
pub fn decode_ledger(data: &[u8]) -> Result<Vec<PurchaseRecord>, CoreError> {
    let records: Vec<PurchaseRecord> = serde_json::from_slice(data)
        .map_err(|e| CoreError::StorageError(format!("Unparseable ledger document: {e}")))?;

    for (idx, record) in records.iter().enumerate() {
        if !record.quantity.is_finite() || record.quantity <= 0.0 {
            return Err(CoreError::StorageError(format!(
                "Record {idx} has invalid quantity {}",
                record.quantity
            )));
        }
        if !record.unit_price.is_finite() || record.unit_price <= 0.0 {
            return Err(CoreError::StorageError(format!(
                "Record {idx} has invalid unit price {}",
                record.unit_price
            )));
        }
        match normalize_currency(&record.currency) {
            Ok(code) if code == record.currency => {}
            _ => {
                return Err(CoreError::StorageError(format!(
                    "Record {idx} has invalid currency '{}'",
                    record.currency
                )));
            }
        }
    }

    Ok(records)
}

/// Render a price series as CSV (`date,close`), one row per point.
#[must_use]
pub fn encode_price_history(points: &[PricePoint]) -> String {
    let mut csv = String::with_capacity(16 * (points.len() + 1));
    csv.push_str(HISTORY_CSV_HEADER);
    csv.push('\n');
    for point in points {
        csv.push_str(&format!("{},{}\n", point.date, point.price));
    }
    csv
}

/// Render purchases as CSV: `date,quantity,unit_price,currency,total`.
/// Currency codes are validated 3-letter codes, so no field needs quoting.
#[must_use]
pub fn encode_purchases_csv(records: &[PurchaseRecord]) -> String {
    let mut csv = String::from(PURCHASES_CSV_HEADER);
    csv.push('\n');
    for record in records {
        csv.push_str(&format!(
            "{},{},{},{},{}\n",
            record.date,
            record.quantity,
            record.unit_price,
            record.currency,
            record.total_paid(),
        ));
    }
    csv
}
