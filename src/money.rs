//! Helpers for monetary amounts and currency codes.
//!
//! Amounts are [Decimal]s so that applying and then reversing a balance change
//! gives back exactly the original balance. SQLite has no decimal type, so
//! amounts are stored as text.

use std::str::FromStr;

use rusqlite::{Row, types::Type};
use rust_decimal::Decimal;

use crate::Error;

/// The currency used when a request does not name one.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Check that `code` looks like an ISO 4217 currency code and upper-case it.
///
/// # Errors
/// Returns [Error::Validation] if `code` is not three ASCII letters.
pub fn normalize_currency(code: &str) -> Result<String, Error> {
    let code = code.trim();

    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(Error::Validation(format!(
            "\"{code}\" is not a three letter currency code"
        )))
    }
}

/// Resolve an optional currency from a request body, falling back to [DEFAULT_CURRENCY].
pub fn currency_or_default(code: Option<&str>) -> Result<String, Error> {
    normalize_currency(code.unwrap_or(DEFAULT_CURRENCY))
}

/// Read a decimal amount stored as text from column `index` of `row`.
pub fn get_decimal(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let text: String = row.get(index)?;

    Decimal::from_str(&text)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}
