use crate::application::ServiceDependencies;
use crate::application::{book, loan};
use crate::domain::{Book, BookId, Loan, LoanId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Local;
use std::sync::Arc;
use validator::Validate;

use super::{
    error::ApiError,
    types::{
        BookDto, BookQuery, CreateLoanRequest, LoanCreatedResponse, LoanDto, LoanQuery,
        PageQuery, PageResponse, ReturnedLoanRequest, UpdateBookRequest,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

async fn find_book_or_404(state: &AppState, id: i64) -> Result<Book, ApiError> {
    book::get_book_by_id(&state.service_deps, BookId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book {} not found", id)))
}

// ============================================================================
// Book handlers
// ============================================================================

/// POST /api/books - 書籍を登録
///
/// タイトル・著者・ISBNは必須。ISBNが登録済みの場合は400を返す。
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookDto>,
) -> Result<(StatusCode, Json<BookDto>), ApiError> {
    req.validate()?;

    let saved = book::save_book(&state.service_deps, req.into_new_book()).await?;

    Ok((StatusCode::CREATED, Json(BookDto::from(saved))))
}

/// GET /api/books/:id - 書籍をIDで取得
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<BookDto>, ApiError> {
    let book = find_book_or_404(&state, id).await?;
    Ok(Json(BookDto::from(book)))
}

/// PUT /api/books/:id - 書籍のタイトルと著者を更新
///
/// ISBNは変更できない。
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<Json<BookDto>, ApiError> {
    req.validate()?;

    let existing = find_book_or_404(&state, id).await?;
    let changed = Book {
        title: req.title,
        author: req.author,
        ..existing
    };

    let updated = book::update_book(&state.service_deps, changed).await?;
    Ok(Json(BookDto::from(updated)))
}

/// DELETE /api/books/:id - 書籍を削除
///
/// 貸出履歴のある書籍は削除できない（400）。
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let existing = find_book_or_404(&state, id).await?;
    book::delete_book(&state.service_deps, &existing).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/books - 書籍を検索
///
/// クエリパラメータ:
/// - title, author, isbn: 部分一致（大文字小文字を区別しない、ANDで結合）
/// - page, size: ページ指定（0始まり、既定サイズ20）
pub async fn find_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookQuery>,
) -> Result<Json<PageResponse<BookDto>>, ApiError> {
    let page = book::find_books(
        &state.service_deps,
        &query.to_filter(),
        query.to_page_request(),
    )
    .await?;

    Ok(Json(PageResponse::from_page(page)))
}

/// GET /api/books/:id/loans - 書籍の貸出履歴を取得
pub async fn loans_by_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<LoanDto>>, ApiError> {
    let book = find_book_or_404(&state, id).await?;

    let page =
        loan::get_loans_by_book(&state.service_deps, &book, query.to_page_request()).await?;

    Ok(Json(PageResponse::from_page(page)))
}

// ============================================================================
// Loan handlers
// ============================================================================

/// POST /api/loans - 書籍を貸し出す
///
/// ISBNに該当する書籍がない場合、または未返却の貸出がある場合は400を返す。
pub async fn create_loan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLoanRequest>,
) -> Result<(StatusCode, Json<LoanCreatedResponse>), ApiError> {
    req.validate()?;

    let book = book::get_book_by_isbn(&state.service_deps, &req.isbn)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Book not found for the given isbn".to_string()))?;

    let mut new_loan = Loan::new(book, req.customer, Local::now().date_naive());
    if let Some(email) = req.customer_email.filter(|e| !e.trim().is_empty()) {
        new_loan = new_loan.with_customer_email(email);
    }

    let saved = loan::save_loan(&state.service_deps, new_loan).await?;
    let id = saved
        .id
        .ok_or_else(|| ApiError::Internal("loan store returned a loan without id".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(LoanCreatedResponse { id: id.value() }),
    ))
}

/// PATCH /api/loans/:id - 返却状態を更新
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ReturnedLoanRequest>,
) -> Result<Json<LoanDto>, ApiError> {
    let existing = loan::get_loan_by_id(&state.service_deps, LoanId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Loan {} not found", id)))?;

    let changed = Loan {
        returned: Some(req.returned),
        ..existing
    };

    let updated = loan::update_loan(&state.service_deps, changed).await?;
    Ok(Json(LoanDto::from(updated)))
}

/// GET /api/loans - 貸出を検索
///
/// クエリパラメータ:
/// - isbn, customer: 完全一致（ORで結合）。両方未指定の場合は空のページ
/// - page, size: ページ指定
pub async fn find_loans(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoanQuery>,
) -> Result<Json<PageResponse<LoanDto>>, ApiError> {
    let page = loan::find_loans(
        &state.service_deps,
        &query.to_filter(),
        query.to_page_request(),
    )
    .await?;

    Ok(Json(PageResponse::from_page(page)))
}
