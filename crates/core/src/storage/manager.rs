use std::io::Write;
use std::path::Path;

use crate::errors::CoreError;
use crate::models::company::CompanyProfile;
use crate::models::price::PricePoint;
use crate::models::purchase::PurchaseRecord;

use super::format;

/// File-level storage operations: atomic writes and typed reads of the
/// files described by `StorageLayout`.
pub struct StorageManager;

impl StorageManager {
    /// Read a ledger file.
    ///
    /// A missing file is an empty ledger. A file that exists but does not
    /// decode is a `StorageError`, never silently treated as empty.
    pub fn load_ledger(path: &Path) -> Result<Vec<PurchaseRecord>, CoreError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no ledger file yet");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(CoreError::FileIO(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        format::decode_ledger(&bytes)
    }

    /// Replace the ledger file with `records`.
    pub fn save_ledger(path: &Path, records: &[PurchaseRecord]) -> Result<(), CoreError> {
        let bytes = format::encode_ledger(records)?;
        Self::write_atomic(path, &bytes)
    }

    /// Read a saved company profile. `Ok(None)` when none was saved yet.
    pub fn load_profile(path: &Path) -> Result<Option<CompanyProfile>, CoreError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let profile = serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::StorageError(format!("Unparseable company profile: {e}")))?;
        Ok(Some(profile))
    }

    pub fn save_profile(path: &Path, profile: &CompanyProfile) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec_pretty(profile)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize profile: {e}")))?;
        Self::write_atomic(path, &bytes)
    }

    pub fn save_price_history(path: &Path, points: &[PricePoint]) -> Result<(), CoreError> {
        let csv = format::encode_price_history(points);
        Self::write_atomic(path, csv.as_bytes())
    }

    /// Write `bytes` to a temporary file next to `path`, flush it to disk,
    /// then rename it over `path`. Readers see either the old content or
    /// the new content, never a partial file.
    pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
            CoreError::FileIO(format!("Failed to create temp file in {}: {e}", dir.display()))
        })?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| {
            CoreError::FileIO(format!("Failed to replace {}: {}", path.display(), e.error))
        })?;
        Ok(())
    }
}
