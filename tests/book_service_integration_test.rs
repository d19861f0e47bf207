mod common;

use async_trait::async_trait;
use chrono::NaiveDate;
use library_api::adapters::mock;
use library_api::application::ServiceDependencies;
use library_api::application::book::{
    BookApplicationError, delete_book, find_books, get_book_by_id, get_book_by_isbn, save_book,
    update_book,
};
use library_api::domain::{Book, BookFilter, BookId, Loan, Page, PageRequest};
use library_api::ports::book_repository::Result as RepoResult;
use library_api::ports::{BookRepository, RepositoryError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// 同時実行をシミュレートするスタブ
// ============================================================================

/// 事前チェックでは何も見つからないが、書き込みはストアの制約で拒否されるBookRepository
///
/// 別のリクエストがチェックと書き込みの間に割り込んだ状況を再現する。
#[derive(Default)]
struct ConstraintRejectingBookRepository {
    save_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

#[async_trait]
impl BookRepository for ConstraintRejectingBookRepository {
    async fn save(&self, _book: Book) -> RepoResult<Book> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        Err(RepositoryError::Conflict("books_isbn_key".to_string()))
    }

    async fn update(&self, id: BookId, _book: Book) -> RepoResult<Book> {
        Err(RepositoryError::NotFound(format!("book {}", id)))
    }

    async fn delete(&self, _id: BookId) -> RepoResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Err(RepositoryError::Referenced("loans_book_id_fkey".to_string()))
    }

    async fn find_by_id(&self, _id: BookId) -> RepoResult<Option<Book>> {
        Ok(None)
    }

    async fn find_by_isbn(&self, _isbn: &str) -> RepoResult<Option<Book>> {
        Ok(None)
    }

    async fn exists_by_isbn(&self, _isbn: &str) -> RepoResult<bool> {
        Ok(false)
    }

    async fn find_matching(
        &self,
        _filter: &BookFilter,
        page: PageRequest,
    ) -> RepoResult<Page<Book>> {
        Ok(Page::empty(page))
    }
}

fn constraint_rejecting_setup() -> (Arc<ConstraintRejectingBookRepository>, ServiceDependencies) {
    let books = Arc::new(ConstraintRejectingBookRepository::default());
    let deps = ServiceDependencies {
        book_repository: books.clone(),
        loan_repository: Arc::new(mock::LoanRepository::new()),
    };
    (books, deps)
}

// ============================================================================
// 登録
// ============================================================================

#[tokio::test]
async fn test_save_book_success() {
    // Arrange
    let setup = common::mock_setup();
    let book = Book::new("Domain-Driven Design", "Eric Evans", "978-0321125217");

    // Act
    let saved = save_book(&setup.deps, book.clone()).await;

    // Assert: IDが採番され、他のフィールドは同じ
    let saved = saved.expect("book should be saved");
    assert!(saved.id.is_some());
    assert_eq!(saved.title, book.title);
    assert_eq!(saved.author, book.author);
    assert_eq!(saved.isbn, book.isbn);
    assert_eq!(setup.books.save_count(), 1);
}

#[tokio::test]
async fn test_save_book_duplicate_isbn() {
    // Arrange: 同じISBNの書籍が登録済み
    let setup = common::mock_setup();
    setup.books.insert(Book::new("First", "Someone", "321"));

    // Act
    let result = save_book(&setup.deps, Book::new("Second", "Another", "321")).await;

    // Assert: DuplicateIsbnエラーで、ストアの保存は呼ばれない
    assert!(matches!(result, Err(BookApplicationError::DuplicateIsbn)));
    assert_eq!(setup.books.save_count(), 0);
    assert_eq!(setup.books.len(), 1);
}

#[tokio::test]
async fn test_save_book_store_conflict_is_duplicate_isbn() {
    // Arrange: 事前チェックは通過するが、保存は一意制約で失敗する
    let (books, deps) = constraint_rejecting_setup();

    // Act
    let result = save_book(&deps, Book::new("T", "A", "321")).await;

    // Assert: ストアのConflictはDuplicateIsbnとして返る
    assert!(matches!(result, Err(BookApplicationError::DuplicateIsbn)));
    assert_eq!(books.save_calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// 取得
// ============================================================================

#[tokio::test]
async fn test_get_book_by_id_unknown_returns_none() {
    let setup = common::mock_setup();

    let result = get_book_by_id(&setup.deps, BookId::new(42)).await.unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn test_get_book_by_isbn() {
    let setup = common::mock_setup();
    let stored = setup.books.insert(Book::new("Refactoring", "Martin Fowler", "654"));

    let found = get_book_by_isbn(&setup.deps, "654").await.unwrap();
    let missing = get_book_by_isbn(&setup.deps, "999").await.unwrap();

    assert_eq!(found, Some(stored));
    assert!(missing.is_none());
}

// ============================================================================
// 更新・削除
// ============================================================================

#[tokio::test]
async fn test_update_book_without_id_is_invalid_argument() {
    let setup = common::mock_setup();

    let result = update_book(&setup.deps, Book::new("T", "A", "321")).await;

    assert!(matches!(
        result,
        Err(BookApplicationError::InvalidArgument(_))
    ));
    assert_eq!(setup.books.update_count(), 0);
}

#[tokio::test]
async fn test_delete_book_without_id_is_invalid_argument() {
    let setup = common::mock_setup();

    let result = delete_book(&setup.deps, &Book::new("T", "A", "321")).await;

    assert!(matches!(
        result,
        Err(BookApplicationError::InvalidArgument(_))
    ));
    assert_eq!(setup.books.delete_count(), 0);
}

#[tokio::test]
async fn test_update_book_keeps_isbn() {
    // Arrange
    let setup = common::mock_setup();
    let stored = setup.books.insert(Book::new("Old title", "Old author", "321"));

    // Act: ISBNも変えようとする
    let changed = Book {
        title: "New title".to_string(),
        author: "New author".to_string(),
        isbn: "999".to_string(),
        ..stored.clone()
    };
    let updated = update_book(&setup.deps, changed).await.unwrap();

    // Assert
    assert_eq!(updated.id, stored.id);
    assert_eq!(updated.title, "New title");
    assert_eq!(updated.author, "New author");
    assert_eq!(updated.isbn, "321");
}

#[tokio::test]
async fn test_delete_book_removes_it() {
    let setup = common::mock_setup();
    let stored = setup.books.insert(Book::new("T", "A", "321"));

    delete_book(&setup.deps, &stored).await.unwrap();

    assert!(setup.books.is_empty());
    assert_eq!(setup.books.delete_count(), 1);
}

#[tokio::test]
async fn test_delete_book_with_loans_is_rejected() {
    // Arrange: 返却済みの貸出が1件ある書籍
    let setup = common::mock_setup();
    let stored = setup.books.insert(Book::new("T", "A", "321"));
    let mut loan = Loan::new(stored.clone(), "Fulano", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    loan.returned = Some(true);
    setup.loans.insert(loan);

    // Act
    let result = delete_book(&setup.deps, &stored).await;

    // Assert: BookHasLoansエラーで、ストアの削除は呼ばれない
    assert!(matches!(result, Err(BookApplicationError::BookHasLoans)));
    assert_eq!(setup.books.delete_count(), 0);
    assert_eq!(setup.books.len(), 1);
}

#[tokio::test]
async fn test_delete_book_store_reference_violation_is_book_has_loans() {
    // Arrange: 貸出の事前チェックは通過するが、削除は外部キー制約で失敗する
    let (books, deps) = constraint_rejecting_setup();
    let book = Book::new("T", "A", "321").with_id(BookId::new(1));

    // Act
    let result = delete_book(&deps, &book).await;

    // Assert
    assert!(matches!(result, Err(BookApplicationError::BookHasLoans)));
    assert_eq!(books.delete_calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// 検索
// ============================================================================

#[tokio::test]
async fn test_find_books_matches_substring_ignoring_case() {
    // Arrange
    let setup = common::mock_setup();
    setup.books.insert(Book::new("The Rust Book", "Klabnik", "1"));
    setup.books.insert(Book::new("Rust in Action", "McNamara", "2"));
    setup.books.insert(Book::new("Clean Code", "Martin", "3"));

    // Act
    let filter = BookFilter {
        title: Some("rust".to_string()),
        ..BookFilter::default()
    };
    let page = find_books(&setup.deps, &filter, PageRequest::new(0, 10))
        .await
        .unwrap();

    // Assert
    assert_eq!(page.total_elements, 2);
    assert!(page.content.iter().all(|b| b.title.contains("Rust")));
}

#[tokio::test]
async fn test_find_books_combines_fields_with_and() {
    let setup = common::mock_setup();
    setup.books.insert(Book::new("The Rust Book", "Klabnik", "1"));
    setup.books.insert(Book::new("Rust in Action", "McNamara", "2"));

    let filter = BookFilter {
        title: Some("Rust".to_string()),
        author: Some("nama".to_string()),
        isbn: None,
    };
    let page = find_books(&setup.deps, &filter, PageRequest::new(0, 10))
        .await
        .unwrap();

    assert_eq!(page.total_elements, 1);
    assert_eq!(page.content[0].isbn, "2");
}

#[tokio::test]
async fn test_find_books_empty_filter_pages_everything() {
    // Arrange: 5冊
    let setup = common::mock_setup();
    for i in 0..5 {
        setup
            .books
            .insert(Book::new(format!("Title {}", i), "Author", format!("isbn-{}", i)));
    }

    // Act: 2冊ずつの2ページ目
    let page = find_books(&setup.deps, &BookFilter::default(), PageRequest::new(1, 2))
        .await
        .unwrap();

    // Assert
    assert_eq!(page.total_elements, 5);
    assert_eq!(page.total_pages(), 3);
    assert_eq!(page.page_number, 1);
    assert_eq!(page.page_size, 2);
    assert_eq!(page.content.len(), 2);
    assert_eq!(page.content[0].isbn, "isbn-2");
}
