use crate::domain::{BookId, Loan, LoanFilter, LoanId, Page, PageRequest};
use crate::ports::RepositoryError;
use crate::ports::loan_repository::{LoanRepository as LoanRepositoryTrait, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Loans {
    rows: BTreeMap<LoanId, Loan>,
    next_id: i64,
}

impl Loans {
    /// `except`以外に書籍の未返却貸出があるか
    fn has_outstanding(&self, book_id: Option<BookId>, except: Option<LoanId>) -> bool {
        self.rows
            .values()
            .any(|l| l.id != except && l.book.id == book_id && l.is_outstanding())
    }
}

/// LoanRepositoryのインメモリ実装
///
/// `loans.book_id`の部分一意インデックスと同様に、
/// 1冊の書籍への2件目の未返却貸出を拒否する。
pub struct LoanRepository {
    loans: Mutex<Loans>,
    save_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl LoanRepository {
    pub fn new() -> Self {
        Self {
            loans: Mutex::new(Loans::default()),
            save_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
        }
    }

    fn loans(&self) -> MutexGuard<'_, Loans> {
        self.loans.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 呼び出し回数を数えずに貸出を直接格納する（貸出日もそのまま保存される）
    pub fn insert(&self, loan: Loan) -> Loan {
        let mut loans = self.loans();
        loans.next_id += 1;
        let id = LoanId::new(loans.next_id);
        let loan = loan.with_id(id);
        loans.rows.insert(id, loan.clone());
        loan
    }

    pub fn save_count(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.loans().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LoanRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoanRepositoryTrait for LoanRepository {
    async fn save(&self, loan: Loan) -> Result<Loan> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);

        if loan.is_outstanding() && self.loans().has_outstanding(loan.book.id, None) {
            return Err(RepositoryError::Conflict(format!(
                "book {:?} already has an outstanding loan",
                loan.book.id
            )));
        }

        Ok(self.insert(loan))
    }

    async fn update(&self, id: LoanId, loan: Loan) -> Result<Loan> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        let mut loans = self.loans();
        if !loans.rows.contains_key(&id) {
            return Err(RepositoryError::NotFound(format!("loan {}", id)));
        }
        if loan.is_outstanding() && loans.has_outstanding(loan.book.id, Some(id)) {
            return Err(RepositoryError::Conflict(format!(
                "book {:?} already has an outstanding loan",
                loan.book.id
            )));
        }

        let loan = loan.with_id(id);
        loans.rows.insert(id, loan.clone());
        Ok(loan)
    }

    async fn find_by_id(&self, id: LoanId) -> Result<Option<Loan>> {
        Ok(self.loans().rows.get(&id).cloned())
    }

    async fn exists_outstanding_for_book(&self, book_id: BookId) -> Result<bool> {
        Ok(self.loans().has_outstanding(Some(book_id), None))
    }

    async fn exists_for_book(&self, book_id: BookId) -> Result<bool> {
        Ok(self
            .loans()
            .rows
            .values()
            .any(|l| l.book.id == Some(book_id)))
    }

    async fn find_by_isbn_or_customer(
        &self,
        isbn: Option<&str>,
        customer: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Loan>> {
        let filter = LoanFilter {
            isbn: isbn.map(str::to_string),
            customer: customer.map(str::to_string),
        };
        let matching: Vec<Loan> = self
            .loans()
            .rows
            .values()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        Ok(Page::slice(matching, page))
    }

    async fn find_by_book(&self, book_id: BookId, page: PageRequest) -> Result<Page<Loan>> {
        let matching: Vec<Loan> = self
            .loans()
            .rows
            .values()
            .filter(|l| l.book.id == Some(book_id))
            .cloned()
            .collect();
        Ok(Page::slice(matching, page))
    }

    async fn find_outstanding_loaned_before(&self, date: NaiveDate) -> Result<Vec<Loan>> {
        Ok(self
            .loans()
            .rows
            .values()
            .filter(|l| l.is_outstanding() && l.loan_date < date)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Book;

    fn book(id: i64, isbn: &str) -> Book {
        Book::new("Title", "Author", isbn).with_id(BookId::new(id))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_save_rejects_second_outstanding_loan() {
        let repo = LoanRepository::new();
        repo.insert(Loan::new(book(1, "321"), "Fulano", date(2024, 3, 1)));

        let result = repo
            .save(Loan::new(book(1, "321"), "Ciclano", date(2024, 3, 2)))
            .await;

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_save_allows_loan_after_return() {
        let repo = LoanRepository::new();
        let mut first = repo.insert(Loan::new(book(1, "321"), "Fulano", date(2024, 3, 1)));
        first.returned = Some(true);
        repo.update(first.id.unwrap(), first).await.unwrap();

        let second = repo
            .save(Loan::new(book(1, "321"), "Ciclano", date(2024, 3, 2)))
            .await
            .unwrap();

        assert_eq!(second.id, Some(LoanId::new(2)));
    }

    #[tokio::test]
    async fn test_update_missing_loan_is_not_found() {
        let repo = LoanRepository::new();
        let loan = Loan::new(book(1, "321"), "Fulano", date(2024, 3, 1));

        let result = repo.update(LoanId::new(5), loan).await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_exists_for_book_counts_returned_loans() {
        let repo = LoanRepository::new();
        let mut loan = Loan::new(book(1, "321"), "Fulano", date(2024, 3, 1));
        loan.returned = Some(true);
        repo.insert(loan);

        assert!(repo.exists_for_book(BookId::new(1)).await.unwrap());
        assert!(!repo.exists_for_book(BookId::new(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_by_book_only_returns_that_book() {
        let repo = LoanRepository::new();
        repo.insert(Loan::new(book(1, "321"), "Fulano", date(2024, 3, 1)));
        repo.insert(Loan::new(book(2, "654"), "Fulano", date(2024, 3, 1)));

        let page = repo
            .find_by_book(BookId::new(2), PageRequest::new(0, 10))
            .await
            .unwrap();

        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].book.isbn, "654");
    }
}
