//! Small field-level validation helpers used by the domain crates.

use crate::error::{DomainError, DomainResult};

/// Trimmed value, or a validation error carrying `message` when blank.
pub fn required<'a>(value: &'a str, message: &str) -> DomainResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(message));
    }
    Ok(trimmed)
}

/// Reject values longer than `max` characters.
pub fn max_len(value: &str, max: usize, field: &str) -> DomainResult<()> {
    if value.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Trimmed optional text; blank becomes `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
