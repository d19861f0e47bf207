use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::{Book, BookFilter, DEFAULT_PAGE_SIZE, Loan, LoanFilter, Page, PageRequest};

/// 空白だけの文字列も空とみなす必須項目チェック
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_blank"));
    }
    Ok(())
}

/// 書籍の表現（POST /api/books のリクエスト、各レスポンス）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BookDto {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Title must not be empty."))]
    pub title: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Author must not be empty."))]
    pub author: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "ISBN must not be empty."))]
    pub isbn: String,
}

impl BookDto {
    /// 新規登録用の書籍に変換する（IDは無視する）
    pub fn into_new_book(self) -> Book {
        Book::new(self.title, self.author, self.isbn)
    }
}

impl From<Book> for BookDto {
    fn from(book: Book) -> Self {
        Self {
            id: book.id.map(|id| id.value()),
            title: book.title,
            author: book.author,
            isbn: book.isbn,
        }
    }
}

/// PUT /api/books/:id のリクエスト
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBookRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Title must not be empty."))]
    pub title: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Author must not be empty."))]
    pub author: String,
}

/// ページ指定のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PageQuery {
    pub fn to_page_request(&self) -> PageRequest {
        page_request(self.page, self.size)
    }
}

fn page_request(page: Option<u32>, size: Option<u32>) -> PageRequest {
    PageRequest::new(page.unwrap_or(0), size.unwrap_or(DEFAULT_PAGE_SIZE))
}

/// 書籍検索のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl BookQuery {
    pub fn to_page_request(&self) -> PageRequest {
        page_request(self.page, self.size)
    }

    pub fn to_filter(&self) -> BookFilter {
        BookFilter {
            title: self.title.clone(),
            author: self.author.clone(),
            isbn: self.isbn.clone(),
        }
    }
}

/// 貸出検索のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct LoanQuery {
    pub isbn: Option<String>,
    pub customer: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl LoanQuery {
    pub fn to_page_request(&self) -> PageRequest {
        page_request(self.page, self.size)
    }

    pub fn to_filter(&self) -> LoanFilter {
        LoanFilter {
            isbn: self.isbn.clone(),
            customer: self.customer.clone(),
        }
    }
}

/// POST /api/loans のリクエスト
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLoanRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "ISBN must not be empty."))]
    pub isbn: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Customer must not be empty."))]
    pub customer: String,
    #[serde(default)]
    pub customer_email: Option<String>,
}

/// 貸出作成レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanCreatedResponse {
    pub id: i64,
}

/// PATCH /api/loans/:id のリクエスト
#[derive(Debug, Deserialize)]
pub struct ReturnedLoanRequest {
    pub returned: bool,
}

/// 貸出レスポンス（GET /api/loans と GET /api/books/:id/loans）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanDto {
    pub id: Option<i64>,
    pub isbn: String,
    pub customer: String,
    pub customer_email: Option<String>,
    pub loan_date: NaiveDate,
    pub returned: Option<bool>,
    pub book: BookDto,
}

impl From<Loan> for LoanDto {
    fn from(loan: Loan) -> Self {
        Self {
            id: loan.id.map(|id| id.value()),
            isbn: loan.book.isbn.clone(),
            customer: loan.customer,
            customer_email: loan.customer_email,
            loan_date: loan.loan_date,
            returned: loan.returned,
            book: BookDto::from(loan.book),
        }
    }
}

/// ページレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u64,
    pub page_number: u32,
    pub page_size: u32,
}

impl<T> PageResponse<T> {
    pub fn from_page<U>(page: Page<U>) -> Self
    where
        U: Into<T>,
    {
        let total_pages = page.total_pages();
        let page = page.map(Into::into);
        Self {
            content: page.content,
            total_elements: page.total_elements,
            total_pages,
            page_number: page.page_number,
            page_size: page.page_size,
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub errors: Vec<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }

    pub fn from_messages(errors: Vec<String>) -> Self {
        Self { errors }
    }
}

/// 検証エラーをメッセージの一覧に変換する
///
/// フィールドの順序はHashMap依存のため、メッセージはソートして返す。
pub fn validation_messages(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_values()
        .flat_map(|errs| errs.iter())
        .map(|err| match &err.message {
            Some(message) => message.to_string(),
            None => err.code.to_string(),
        })
        .collect();
    messages.sort();
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BookId;

    #[test]
    fn test_book_dto_validation_collects_all_errors() {
        let dto = BookDto {
            id: None,
            title: String::new(),
            author: "Author".to_string(),
            isbn: " ".to_string(),
        };
        let errors = validation_messages(&dto.validate().unwrap_err());
        assert_eq!(
            errors,
            vec!["ISBN must not be empty.", "Title must not be empty."]
        );
    }

    #[test]
    fn test_create_loan_request_requires_isbn_and_customer() {
        let req: CreateLoanRequest = serde_json::from_str(r#"{"customer": "  "}"#).unwrap();
        let errors = validation_messages(&req.validate().unwrap_err());
        assert_eq!(
            errors,
            vec!["Customer must not be empty.", "ISBN must not be empty."]
        );

        let req: CreateLoanRequest =
            serde_json::from_str(r#"{"isbn": "321", "customer": "Fulano"}"#).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_book_request_rejects_blank_author() {
        let req = UpdateBookRequest {
            title: "Title".to_string(),
            author: "\t".to_string(),
        };
        let errors = validation_messages(&req.validate().unwrap_err());
        assert_eq!(errors, vec!["Author must not be empty."]);
    }

    #[test]
    fn test_into_new_book_drops_id() {
        let dto = BookDto {
            id: Some(9),
            title: "T".to_string(),
            author: "A".to_string(),
            isbn: "1".to_string(),
        };
        assert!(dto.into_new_book().id.is_none());
    }

    #[test]
    fn test_loan_dto_copies_book_isbn() {
        let book = Book::new("T", "A", "321").with_id(BookId::new(1));
        let loan = Loan::new(book, "Fulano", NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        let dto = LoanDto::from(loan);
        assert_eq!(dto.isbn, "321");
        assert_eq!(dto.book.id, Some(1));
        assert_eq!(dto.customer, "Fulano");
    }

    #[test]
    fn test_page_query_defaults() {
        let request = PageQuery::default().to_page_request();
        assert_eq!(request.page(), 0);
        assert_eq!(request.size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_page_response_counts_pages() {
        let books = vec![
            Book::new("A", "X", "1").with_id(BookId::new(1)),
            Book::new("B", "Y", "2").with_id(BookId::new(2)),
            Book::new("C", "Z", "3").with_id(BookId::new(3)),
        ];
        let page = Page::slice(books, PageRequest::new(0, 2));
        let response: PageResponse<BookDto> = PageResponse::from_page(page);
        assert_eq!(response.content.len(), 2);
        assert_eq!(response.total_elements, 3);
        assert_eq!(response.total_pages, 2);
    }
}
