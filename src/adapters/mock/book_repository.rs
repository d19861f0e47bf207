use crate::domain::{Book, BookFilter, BookId, Page, PageRequest};
use crate::ports::RepositoryError;
use crate::ports::book_repository::{BookRepository as BookRepositoryTrait, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Books {
    rows: BTreeMap<BookId, Book>,
    next_id: i64,
}

/// BookRepositoryのインメモリ実装
///
/// テストと`STORAGE=memory`での起動に使用する。
/// ISBNの一意制約をデータベースと同様に守り、書き込みの呼び出し回数を記録する。
pub struct BookRepository {
    books: Mutex<Books>,
    save_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl BookRepository {
    pub fn new() -> Self {
        Self {
            books: Mutex::new(Books::default()),
            save_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    fn books(&self) -> MutexGuard<'_, Books> {
        self.books.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 呼び出し回数を数えずに書籍を直接格納する（テストデータの準備用）
    pub fn insert(&self, book: Book) -> Book {
        let mut books = self.books();
        books.next_id += 1;
        let id = BookId::new(books.next_id);
        let book = book.with_id(id);
        books.rows.insert(id, book.clone());
        book
    }

    pub fn save_count(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.books().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BookRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookRepositoryTrait for BookRepository {
    async fn save(&self, book: Book) -> Result<Book> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);

        if self.books().rows.values().any(|b| b.isbn == book.isbn) {
            return Err(RepositoryError::Conflict(format!(
                "isbn {} already exists",
                book.isbn
            )));
        }

        Ok(self.insert(book))
    }

    async fn update(&self, id: BookId, book: Book) -> Result<Book> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        let mut books = self.books();
        let stored = books
            .rows
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("book {}", id)))?;
        stored.title = book.title;
        stored.author = book.author;
        Ok(stored.clone())
    }

    async fn delete(&self, id: BookId) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        self.books()
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("book {}", id)))
    }

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>> {
        Ok(self.books().rows.get(&id).cloned())
    }

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        Ok(self.books().rows.values().find(|b| b.isbn == isbn).cloned())
    }

    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool> {
        Ok(self.books().rows.values().any(|b| b.isbn == isbn))
    }

    async fn find_matching(&self, filter: &BookFilter, page: PageRequest) -> Result<Page<Book>> {
        let matching: Vec<Book> = self
            .books()
            .rows
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        Ok(Page::slice(matching, page))
    }
}
