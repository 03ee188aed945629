use super::purchase::PurchaseRecord;

/// Append-only purchase history of a single ticker.
///
/// Records keep insertion order; nothing in the crate edits or removes
/// one after it was appended. Corrections are recorded as new purchases.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    /// Ticker symbol, uppercased (e.g., "AAPL", "CPI.JO")
    pub ticker: String,

    records: Vec<PurchaseRecord>,
}

impl Ledger {
    /// Create an empty ledger for a ticker that has never been tracked.
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into().to_uppercase(),
            records: Vec::new(),
        }
    }

    /// Rebuild a ledger from records read back from storage.
    pub fn from_records(ticker: impl Into<String>, records: Vec<PurchaseRecord>) -> Self {
        Self {
            ticker: ticker.into().to_uppercase(),
            records,
        }
    }

    #[must_use]
    pub fn records(&self) -> &[PurchaseRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&PurchaseRecord> {
        self.records.last()
    }

    /// The ledger as it would look after appending `record`, leaving
    /// `self` untouched until the new state has been persisted.
    pub(crate) fn appended(&self, record: PurchaseRecord) -> Vec<PurchaseRecord> {
        let mut next = Vec::with_capacity(self.records.len() + 1);
        next.extend_from_slice(&self.records);
        next.push(record);
        next
    }

    pub(crate) fn replace_records(&mut self, records: Vec<PurchaseRecord>) {
        self.records = records;
    }
}
