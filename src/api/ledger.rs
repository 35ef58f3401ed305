//! Borrow, return and audit history endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::borrow::{BorrowReceipt, BorrowRecord, BorrowRecordQuery, LedgerRequest},
};

use super::{AppJson, AppQuery};

/// Borrow copies of a book
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "ledger",
    request_body = LedgerRequest,
    responses(
        (status = 201, description = "Books borrowed", body = BorrowReceipt),
        (status = 400, description = "Invalid quantity or insufficient stock", body = crate::error::ErrorResponse),
        (status = 404, description = "User or book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow(
    State(state): State<crate::AppState>,
    AppJson(request): AppJson<LedgerRequest>,
) -> AppResult<(StatusCode, Json<BorrowReceipt>)> {
    let receipt = state.services.ledger.borrow(request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Return borrowed copies of a book
#[utoipa::path(
    post,
    path = "/return",
    tag = "ledger",
    request_body = LedgerRequest,
    responses(
        (status = 201, description = "Books returned", body = BorrowReceipt),
        (status = 400, description = "Invalid quantity, nothing to return or over-return", body = crate::error::ErrorResponse),
        (status = 404, description = "User or book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_books(
    State(state): State<crate::AppState>,
    AppJson(request): AppJson<LedgerRequest>,
) -> AppResult<(StatusCode, Json<BorrowReceipt>)> {
    let receipt = state.services.ledger.return_books(request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Borrow/return history, newest first
#[utoipa::path(
    get,
    path = "/borrow-records",
    tag = "ledger",
    params(BorrowRecordQuery),
    responses(
        (status = 200, description = "Audit history", body = Vec<BorrowRecord>),
        (status = 400, description = "Malformed filter", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_borrow_records(
    State(state): State<crate::AppState>,
    AppQuery(query): AppQuery<BorrowRecordQuery>,
) -> AppResult<Json<Vec<BorrowRecord>>> {
    let records = state.services.ledger.records(query).await?;
    Ok(Json(records))
}
