pub mod appointment;
pub mod doctor;
pub mod enums;
pub mod expense;
pub mod filters;
pub mod patient;
pub mod payment;

pub use appointment::*;
pub use doctor::*;
pub use expense::*;
pub use filters::*;
pub use patient::*;
pub use payment::*;

/// Generate a collection-prefixed document id, e.g. `patient-2b1f...`.
pub fn new_id(kind: &str) -> String {
    format!("{kind}-{}", uuid::Uuid::new_v4())
}

/// Trim a free-text field; blank becomes `None`.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trimmed, non-blank required text field.
pub(crate) fn required(field: &str, value: Option<String>) -> Result<String, crate::db::DatabaseError> {
    non_empty(value).ok_or_else(|| {
        crate::db::DatabaseError::ConstraintViolation(format!("{field} is required"))
    })
}

/// Largest amount accepted for any money field. Keeps ledger and report
/// sums far from `Decimal::MAX`.
pub const MAX_AMOUNT: rust_decimal::Decimal = rust_decimal::Decimal::from_parts(0xA4C6_8000, 0x38D7E, 0, false, 0);

/// A money field must lie in `0..=MAX_AMOUNT`.
pub(crate) fn check_amount(field: &str, amount: rust_decimal::Decimal) -> Result<(), crate::db::DatabaseError> {
    if amount < rust_decimal::Decimal::ZERO {
        return Err(crate::db::DatabaseError::ConstraintViolation(format!(
            "{field} cannot be negative"
        )));
    }
    if amount > MAX_AMOUNT {
        return Err(crate::db::DatabaseError::ConstraintViolation(format!(
            "{field} exceeds the maximum of {MAX_AMOUNT}"
        )));
    }
    Ok(())
}
