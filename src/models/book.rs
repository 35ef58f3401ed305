//! Book (catalog entry) model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, NoneAsEmptyString, PickFirst};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{not_blank, valid_price};

/// Book row joined with its category name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub price: Decimal,
    /// Copies available for lending
    pub stock: i32,
    pub book_category_id: i32,
    pub category_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create or update book request.
///
/// Numeric fields accept JSON numbers as well as numeric strings, which is
/// what HTML forms submit.
#[serde_as]
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    #[validate(
        custom(function = "not_blank"),
        length(max = 255, message = "Title must be at most 255 characters")
    )]
    pub title: String,
    #[validate(
        custom(function = "not_blank"),
        length(max = 255, message = "Author must be at most 255 characters")
    )]
    pub author: String,
    #[validate(custom(function = "valid_price"))]
    #[schema(value_type = f64)]
    pub price: Decimal,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[validate(range(
        min = 0,
        max = 1000000,
        message = "Stock must be an integer between 0 and 1000000"
    ))]
    pub stock: i32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub book_category_id: i32,
}

impl BookInput {
    /// Copy with title and author trimmed, as stored
    pub fn normalized(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            ..self.clone()
        }
    }
}

/// Book listing filters
#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookQuery {
    /// Only books of this category
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub category_id: Option<i32>,
    /// Case-insensitive substring matched against title and author
    pub search: Option<String>,
}

impl BookQuery {
    /// Search term as an ILIKE pattern, `None` when absent or blank
    pub fn search_pattern(&self) -> Option<String> {
        let term = self.search.as_deref()?.trim();
        if term.is_empty() {
            return None;
        }
        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{}%", escaped))
    }
}
