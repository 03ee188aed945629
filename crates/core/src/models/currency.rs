use crate::errors::CoreError;

/// Trim and upper-case an ISO 4217 code, rejecting anything that is not
/// exactly three ASCII letters.
pub fn normalize_currency(code: &str) -> Result<String, CoreError> {
    let trimmed = code.trim().to_uppercase();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::ValidationError(format!(
            "Invalid currency code '{code}': must be exactly 3 ASCII letters (e.g., USD, EUR, ZAR)"
        )));
    }
    Ok(trimmed)
}
