//! Book category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::not_blank;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Number of books filed under this category
    #[sqlx(default)]
    pub book_count: Option<i64>,
}

/// Create or rename category request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CategoryInput {
    #[validate(
        custom(function = "not_blank"),
        length(max = 255, message = "Category name must be at most 255 characters")
    )]
    pub name: String,
}

impl CategoryInput {
    pub fn normalized_name(&self) -> String {
        self.name.trim().to_string()
    }
}
