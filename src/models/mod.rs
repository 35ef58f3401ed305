//! Data models for Bookshelf

pub mod book;
pub mod borrow;
pub mod category;
pub mod user;

use rust_decimal::Decimal;
use std::borrow::Cow;
use validator::ValidationError;

// Re-export commonly used types
pub use book::{Book, BookInput, BookQuery};
pub use borrow::{BorrowAction, BorrowReceipt, BorrowRecord, CurrentBorrow, LedgerCommand};
pub use category::{Category, CategoryInput};
pub use user::{User, UserInput};

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Rejects strings that are empty once surrounding whitespace is removed
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Prices fit `NUMERIC(10, 2)`: non-negative, below 10^8, at most two decimals
pub(crate) fn valid_price(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(field_error("negative", "Price must be a non-negative number"));
    }
    if *value >= Decimal::from(100_000_000) {
        return Err(field_error("too_large", "Price must be below 100000000"));
    }
    if value.normalize().scale() > 2 {
        return Err(field_error("scale", "Price must have at most 2 decimal places"));
    }
    Ok(())
}
