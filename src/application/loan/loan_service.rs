use crate::application::ServiceDependencies;
use crate::domain::{self, Book, BookId, Loan, LoanFilter, LoanId, Page, PageRequest};
use crate::ports::RepositoryError;
use chrono::{Local, NaiveDate};

use super::errors::{LoanApplicationError, Result};

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// 部分一意インデックスの違反を業務エラーに読み替える
fn map_write_error(err: RepositoryError) -> LoanApplicationError {
    match err {
        RepositoryError::Conflict(_) => LoanApplicationError::BookAlreadyLoaned,
        other => LoanApplicationError::RepositoryError(other),
    }
}

fn require_book_id(book: &Book) -> Result<BookId> {
    book.id.ok_or_else(|| {
        LoanApplicationError::InvalidArgument("Book id must not be empty".to_string())
    })
}

fn require_loan_id(loan: &Loan) -> Result<LoanId> {
    loan.id.ok_or_else(|| {
        LoanApplicationError::InvalidArgument("Loan id must not be empty".to_string())
    })
}

/// 書籍を貸し出す
///
/// ビジネスルール：
/// - 書籍に未返却の貸出がないこと
///
/// 貸出日は今日の日付で上書きされる。
///
/// # 一貫性保証
///
/// 事前チェックはcheck-then-actのため、同じ書籍への同時貸出は
/// 両方がチェックを通過しうる。ストア側の一意制約が後続の書き込みを拒否し、
/// その`Conflict`は`BookAlreadyLoaned`に変換される。
///
/// # エラー
/// - BookAlreadyLoaned: 未返却の貸出がある（ストアの保存は呼ばれない）
/// - InvalidArgument: 参照先の書籍にIDがない
pub async fn save_loan(deps: &ServiceDependencies, loan: Loan) -> Result<Loan> {
    let book_id = require_book_id(&loan.book)?;

    // 1. 未返却の貸出がないか確認
    let outstanding = deps
        .loan_repository
        .exists_outstanding_for_book(book_id)
        .await
        .map_err(LoanApplicationError::RepositoryError)?;

    if outstanding {
        tracing::warn!(book_id = %book_id, "rejected loan for a book that is already loaned");
        return Err(LoanApplicationError::BookAlreadyLoaned);
    }

    // 2. 貸出日を設定して保存
    let loan = Loan {
        loan_date: today(),
        ..loan
    };

    let saved = deps
        .loan_repository
        .save(loan)
        .await
        .map_err(map_write_error)?;

    tracing::info!(
        loan_id = ?saved.id,
        book_id = %book_id,
        customer = %saved.customer,
        "book loaned"
    );
    Ok(saved)
}

/// IDで貸出を取得する
pub async fn get_loan_by_id(deps: &ServiceDependencies, id: LoanId) -> Result<Option<Loan>> {
    deps.loan_repository
        .find_by_id(id)
        .await
        .map_err(LoanApplicationError::RepositoryError)
}

/// 貸出の状態を永続化する
///
/// 返却の記録に使用される。事前チェックは行わない。
///
/// # エラー
/// - InvalidArgument: 貸出にIDがない（ストアは呼ばれない）
/// - BookAlreadyLoaned: 返却済みの貸出を未返却に戻そうとしたが、
///   書籍は既に別の貸出で貸出中（ストアの一意制約による）
pub async fn update_loan(deps: &ServiceDependencies, loan: Loan) -> Result<Loan> {
    let id = require_loan_id(&loan)?;

    let updated = deps
        .loan_repository
        .update(id, loan)
        .await
        .map_err(map_write_error)?;

    tracing::info!(loan_id = %id, returned = ?updated.returned, "loan updated");
    Ok(updated)
}

/// ISBN または利用者名で貸出を検索する
///
/// 2つの条件はORで結合される。どちらも完全一致。
/// 両方未指定の場合はストアを呼ばずに空のページを返す。
pub async fn find_loans(
    deps: &ServiceDependencies,
    filter: &LoanFilter,
    page: PageRequest,
) -> Result<Page<Loan>> {
    if filter.is_empty() {
        return Ok(Page::empty(page));
    }

    deps.loan_repository
        .find_by_isbn_or_customer(filter.isbn(), filter.customer(), page)
        .await
        .map_err(LoanApplicationError::RepositoryError)
}

/// 書籍の貸出履歴をページ単位で取得する
pub async fn get_loans_by_book(
    deps: &ServiceDependencies,
    book: &Book,
    page: PageRequest,
) -> Result<Page<Loan>> {
    let book_id = require_book_id(book)?;

    deps.loan_repository
        .find_by_book(book_id, page)
        .await
        .map_err(LoanApplicationError::RepositoryError)
}

/// 延滞中の貸出をすべて取得する
///
/// 貸出日が「今日 - 貸出期間（4日）」より前で、未返却の貸出を返す。
pub async fn get_all_late_loans(deps: &ServiceDependencies) -> Result<Vec<Loan>> {
    get_late_loans_as_of(deps, today()).await
}

/// 指定日を基準に延滞中の貸出を取得する
pub async fn get_late_loans_as_of(
    deps: &ServiceDependencies,
    today: NaiveDate,
) -> Result<Vec<Loan>> {
    let threshold = domain::late_threshold(today);

    let loans = deps
        .loan_repository
        .find_outstanding_loaned_before(threshold)
        .await
        .map_err(LoanApplicationError::RepositoryError)?;

    tracing::debug!(%threshold, count = loans.len(), "late loans fetched");
    Ok(loans)
}
