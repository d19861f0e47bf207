use crate::application::ServiceDependencies;
use crate::domain::{Book, BookFilter, BookId, Page, PageRequest};
use crate::ports::RepositoryError;

use super::errors::{BookApplicationError, Result};

/// 更新・削除の対象IDを取り出すヘルパー関数
///
/// IDのない書籍は呼び出し側の誤用として扱う。
fn require_id(book: &Book) -> Result<BookId> {
    book.id.ok_or_else(|| {
        BookApplicationError::InvalidArgument("Book id must not be empty".to_string())
    })
}

/// 書籍を登録する
///
/// ビジネスルール：
/// - ISBNが未登録であること
///
/// 事前チェックとストアの一意制約の両方で重複を検出する。
/// 同時登録で事前チェックをすり抜けた場合も`DuplicateIsbn`になる。
///
/// # 戻り値
/// 採番済みIDを持つ書籍
pub async fn save_book(deps: &ServiceDependencies, book: Book) -> Result<Book> {
    // 1. ISBNの重複確認
    let exists = deps
        .book_repository
        .exists_by_isbn(&book.isbn)
        .await
        .map_err(BookApplicationError::RepositoryError)?;

    if exists {
        tracing::warn!(isbn = %book.isbn, "rejected book with duplicate isbn");
        return Err(BookApplicationError::DuplicateIsbn);
    }

    // 2. 保存（一意制約違反は重複として扱う）
    let saved = deps
        .book_repository
        .save(book)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => BookApplicationError::DuplicateIsbn,
            other => BookApplicationError::RepositoryError(other),
        })?;

    tracing::info!(book_id = ?saved.id, isbn = %saved.isbn, "book saved");
    Ok(saved)
}

/// IDで書籍を取得する
///
/// 見つからない場合は`None`（エラーではない）。
pub async fn get_book_by_id(deps: &ServiceDependencies, id: BookId) -> Result<Option<Book>> {
    deps.book_repository
        .find_by_id(id)
        .await
        .map_err(BookApplicationError::RepositoryError)
}

/// ISBNで書籍を取得する
pub async fn get_book_by_isbn(deps: &ServiceDependencies, isbn: &str) -> Result<Option<Book>> {
    deps.book_repository
        .find_by_isbn(isbn)
        .await
        .map_err(BookApplicationError::RepositoryError)
}

/// 書籍を削除する
///
/// ビジネスルール：
/// - 書籍を参照する貸出がないこと（返却済みを含む）
///
/// 事前チェックをすり抜けた場合もストアの外部キー制約が`Referenced`を返し、
/// `BookHasLoans`に変換される。
///
/// # エラー
/// - InvalidArgument: 書籍にIDがない（ストアは呼ばれない）
/// - BookHasLoans: 貸出履歴がある（ストアの削除は呼ばれない）
pub async fn delete_book(deps: &ServiceDependencies, book: &Book) -> Result<()> {
    let id = require_id(book)?;

    // 1. 貸出履歴の確認
    let has_loans = deps
        .loan_repository
        .exists_for_book(id)
        .await
        .map_err(BookApplicationError::RepositoryError)?;

    if has_loans {
        tracing::warn!(book_id = %id, "rejected delete of a book with loans");
        return Err(BookApplicationError::BookHasLoans);
    }

    // 2. 削除（外部キー制約違反は貸出履歴ありとして扱う）
    deps.book_repository
        .delete(id)
        .await
        .map_err(|e| match e {
            RepositoryError::Referenced(_) => BookApplicationError::BookHasLoans,
            other => BookApplicationError::RepositoryError(other),
        })?;

    tracing::info!(book_id = %id, "book deleted");
    Ok(())
}

/// 書籍を更新する
///
/// タイトルと著者を永続化する。ISBNは登録後に変更できない。
///
/// # エラー
/// - InvalidArgument: 書籍にIDがない（ストアは呼ばれない）
pub async fn update_book(deps: &ServiceDependencies, book: Book) -> Result<Book> {
    let id = require_id(&book)?;

    deps.book_repository
        .update(id, book)
        .await
        .map_err(BookApplicationError::RepositoryError)
}

/// 条件に一致する書籍をページ単位で検索する
///
/// 値のある各フィールドについて大文字小文字を区別しない部分一致を行い、ANDで結合する。
pub async fn find_books(
    deps: &ServiceDependencies,
    filter: &BookFilter,
    page: PageRequest,
) -> Result<Page<Book>> {
    tracing::debug!(?filter, page = page.page(), size = page.size(), "searching books");

    deps.book_repository
        .find_matching(filter, page)
        .await
        .map_err(BookApplicationError::RepositoryError)
}
