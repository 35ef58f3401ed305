//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, categories, health, ledger, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookshelf API",
        version = "0.1.0",
        description = "Book inventory and lending tracker REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Categories
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::get_current_borrows,
        // Ledger
        ledger::borrow,
        ledger::return_books,
        ledger::list_borrow_records,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::BookInput,
            // Categories
            crate::models::category::Category,
            crate::models::category::CategoryInput,
            // Users
            crate::models::user::User,
            crate::models::user::UserInput,
            // Ledger
            crate::models::borrow::BorrowAction,
            crate::models::borrow::BorrowRecord,
            crate::models::borrow::CurrentBorrow,
            crate::models::borrow::LedgerRequest,
            crate::models::borrow::BorrowReceipt,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book catalog management"),
        (name = "categories", description = "Book categories"),
        (name = "users", description = "User registry"),
        (name = "ledger", description = "Borrow, return and audit history")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
