use crate::application::book::BookApplicationError;
use crate::application::loan::LoanApplicationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::{ErrorResponse, validation_messages};

const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// API層のエラー型
///
/// アプリケーション層のエラーとリクエスト検証のエラーをHTTPレスポンスにマッピングする。
#[derive(Debug)]
pub enum ApiError {
    Book(BookApplicationError),
    Loan(LoanApplicationError),
    /// 404 Not Found
    NotFound(String),
    /// 必須項目の検証エラー（すべてのメッセージを返す）
    Validation(Vec<String>),
    BadRequest(String),
    /// アプリケーション層の外で検出した内部不整合
    Internal(String),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(validation_messages(&errors))
    }
}

impl From<BookApplicationError> for ApiError {
    fn from(err: BookApplicationError) -> Self {
        ApiError::Book(err)
    }
}

impl From<LoanApplicationError> for ApiError {
    fn from(err: LoanApplicationError) -> Self {
        ApiError::Loan(err)
    }
}

fn internal_error(err: &dyn std::error::Error) -> (StatusCode, ErrorResponse) {
    // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
    match err.source() {
        Some(source) => tracing::error!("{}: {}", err, source),
        None => tracing::error!("{}", err),
    }
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorResponse::new(INTERNAL_ERROR_MESSAGE),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            // 400 Bad Request - ビジネスルール違反
            ApiError::Book(BookApplicationError::DuplicateIsbn) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(BookApplicationError::DuplicateIsbn.to_string()),
            ),
            ApiError::Book(BookApplicationError::BookHasLoans) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(BookApplicationError::BookHasLoans.to_string()),
            ),
            ApiError::Loan(LoanApplicationError::BookAlreadyLoaned) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(LoanApplicationError::BookAlreadyLoaned.to_string()),
            ),
            ApiError::Validation(messages) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::from_messages(messages))
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, ErrorResponse::new(message)),

            // 404 Not Found
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, ErrorResponse::new(message)),

            // 500 Internal Server Error - 呼び出し側の誤用とストア障害
            ApiError::Book(ref err) => internal_error(err),
            ApiError::Loan(ref err) => internal_error(err),
            ApiError::Internal(message) => {
                tracing::error!("{}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(INTERNAL_ERROR_MESSAGE),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
