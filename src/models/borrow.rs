//! Lending ledger: audit records, outstanding loans and the borrow/return rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, NoneAsEmptyString, PickFirst};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowAction {
    Borrow,
    Return,
}

impl BorrowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowAction::Borrow => "borrow",
            BorrowAction::Return => "return",
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown borrow action '{0}', expected 'borrow' or 'return'")]
pub struct UnknownAction(pub String);

impl std::str::FromStr for BorrowAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrow" => Ok(BorrowAction::Borrow),
            "return" => Ok(BorrowAction::Return),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

impl TryFrom<String> for BorrowAction {
    type Error = UnknownAction;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for BorrowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit entry for one borrow or return
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRecord {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    #[sqlx(try_from = "String")]
    pub action: BorrowAction,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
}

/// Copies of one book currently held by one user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentBorrow {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_author: Option<String>,
}

/// Body of `POST /borrow` and `POST /return`
#[serde_as]
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRequest {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub user_id: i32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub book_id: i32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub quantity: i64,
}

/// A ledger request whose quantity has been checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerCommand {
    pub user_id: i32,
    pub book_id: i32,
    pub quantity: i32,
}

impl TryFrom<LedgerRequest> for LedgerCommand {
    type Error = AppError;

    fn try_from(request: LedgerRequest) -> AppResult<Self> {
        Ok(Self {
            user_id: request.user_id,
            book_id: request.book_id,
            quantity: validate_quantity(request.quantity)?,
        })
    }
}

/// Result of an accepted borrow or return
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowReceipt {
    pub record: BorrowRecord,
    /// Book stock after the operation
    pub stock: i32,
    /// Copies the user still holds, 0 once the loan is fully returned
    pub outstanding: i32,
}

/// Audit history filters
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BorrowRecordQuery {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub user_id: Option<i32>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub book_id: Option<i32>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub action: Option<BorrowAction>,
}

/// Quantities must be whole numbers of at least one copy
pub fn validate_quantity(quantity: i64) -> AppResult<i32> {
    if quantity < 1 {
        return Err(AppError::Validation(
            "Quantity must be a positive integer".to_string(),
        ));
    }
    i32::try_from(quantity)
        .map_err(|_| AppError::Validation(format!("Quantity {} is too large", quantity)))
}

/// Checks that `quantity` copies can be lent out of `stock`
pub fn check_borrow(stock: i32, quantity: i32) -> AppResult<()> {
    if stock < quantity {
        return Err(AppError::BusinessRule(format!(
            "Insufficient stock: requested {}, available {}",
            quantity, stock
        )));
    }
    Ok(())
}

/// What a return does to the outstanding loan row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnPlan {
    /// Everything held comes back, the row goes away
    Remove,
    /// Part comes back, `remaining` copies stay out
    Decrement { remaining: i32 },
}

impl ReturnPlan {
    pub fn remaining(&self) -> i32 {
        match self {
            ReturnPlan::Remove => 0,
            ReturnPlan::Decrement { remaining } => *remaining,
        }
    }
}

/// Decides how returning `quantity` copies affects an `outstanding` loan
pub fn plan_return(outstanding: Option<i32>, quantity: i32) -> AppResult<ReturnPlan> {
    let held = outstanding.ok_or_else(|| {
        AppError::BusinessRule("Nothing to return: this book is not borrowed by this user".to_string())
    })?;

    if held < quantity {
        return Err(AppError::BusinessRule(format!(
            "Cannot return {} copies, only {} borrowed",
            quantity, held
        )));
    }

    if held == quantity {
        Ok(ReturnPlan::Remove)
    } else {
        Ok(ReturnPlan::Decrement {
            remaining: held - quantity,
        })
    }
}
