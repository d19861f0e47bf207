use axum::{
    Router,
    routing::{get, patch, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, create_book, create_loan, delete_book, find_books, find_loans, get_book,
    loans_by_book, return_book, update_book,
};

/// Creates the API router with all book and loan endpoints
///
/// Books:
/// - POST /api/books - Register a book
/// - GET /api/books - Search books by example
/// - GET /api/books/:id - Get a book
/// - PUT /api/books/:id - Update title and author
/// - DELETE /api/books/:id - Delete a book
/// - GET /api/books/:id/loans - Loan history of a book
///
/// Loans:
/// - POST /api/loans - Loan a book by ISBN
/// - GET /api/loans - Find loans by ISBN or customer
/// - PATCH /api/loans/:id - Mark a loan as returned
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route("/api/books", post(create_book).get(find_books))
        .route(
            "/api/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/api/books/:id/loans", get(loans_by_book))
        .route("/api/loans", post(create_loan).get(find_loans))
        .route("/api/loans/:id", patch(return_book))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
