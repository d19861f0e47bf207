use crate::domain::{Book, BookId, Loan, LoanId, Page, PageRequest};
use crate::ports::RepositoryError;
use crate::ports::loan_repository::{LoanRepository as LoanRepositoryTrait, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};

use super::map_sqlx_error;

/// 貸出と参照先書籍を結合したSELECT句
const SELECT_LOANS: &str = r#"
    SELECT
        l.id,
        l.customer,
        l.customer_email,
        l.loan_date,
        l.returned,
        b.id AS book_id,
        b.title,
        b.author,
        b.isbn
    FROM loans l
    JOIN books b ON b.id = l.book_id
"#;

/// PostgreSQLの行データをLoanに変換する
///
/// 結合された書籍列からLoan内のBookを組み立てる。
fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    let id: i64 = row.try_get("id").map_err(RepositoryError::backend)?;
    let book_id: i64 = row.try_get("book_id").map_err(RepositoryError::backend)?;

    let book = Book {
        id: Some(BookId::new(book_id)),
        title: row.try_get("title").map_err(RepositoryError::backend)?,
        author: row.try_get("author").map_err(RepositoryError::backend)?,
        isbn: row.try_get("isbn").map_err(RepositoryError::backend)?,
    };

    Ok(Loan {
        id: Some(LoanId::new(id)),
        book,
        customer: row.try_get("customer").map_err(RepositoryError::backend)?,
        customer_email: row
            .try_get("customer_email")
            .map_err(RepositoryError::backend)?,
        loan_date: row.try_get("loan_date").map_err(RepositoryError::backend)?,
        returned: row.try_get("returned").map_err(RepositoryError::backend)?,
    })
}

fn referenced_book_id(loan: &Loan) -> Result<BookId> {
    loan.book
        .id
        .ok_or_else(|| RepositoryError::NotFound("loan references an unsaved book".to_string()))
}

/// LoanRepositoryのPostgreSQL実装
pub struct LoanRepository {
    pool: PgPool,
}

impl LoanRepository {
    /// PostgreSQLコネクションプールから新しいLoanRepositoryを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 結合済みの貸出をページ単位で取得する
    ///
    /// `push_where`が追加した条件で総件数とページ内容の2回クエリを発行する。
    async fn fetch_page<F>(&self, page: PageRequest, push_where: F) -> Result<Page<Loan>>
    where
        F: Fn(&mut QueryBuilder<'_, Postgres>),
    {
        let mut count_query = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM loans l JOIN books b ON b.id = l.book_id",
        );
        push_where(&mut count_query);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut select_query = QueryBuilder::<Postgres>::new(SELECT_LOANS);
        push_where(&mut select_query);
        select_query
            .push(" ORDER BY l.id LIMIT ")
            .push_bind(i64::from(page.size()))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = select_query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let loans = rows.iter().map(map_row_to_loan).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(loans, page, total as u64))
    }
}

#[async_trait]
impl LoanRepositoryTrait for LoanRepository {
    /// 貸出を保存し、採番されたIDを付与して返す
    ///
    /// loans_one_outstanding_per_book インデックスの違反は`Conflict`になる。
    async fn save(&self, loan: Loan) -> Result<Loan> {
        let book_id = referenced_book_id(&loan)?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO loans (book_id, customer, customer_email, loan_date, returned)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(book_id.value())
        .bind(&loan.customer)
        .bind(&loan.customer_email)
        .bind(loan.loan_date)
        .bind(loan.returned)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(loan.with_id(LoanId::new(id)))
    }

    async fn update(&self, id: LoanId, loan: Loan) -> Result<Loan> {
        let book_id = referenced_book_id(&loan)?;

        let result = sqlx::query(
            r#"
            UPDATE loans
            SET book_id = $2,
                customer = $3,
                customer_email = $4,
                loan_date = $5,
                returned = $6
            WHERE id = $1
            "#,
        )
        .bind(id.value())
        .bind(book_id.value())
        .bind(&loan.customer)
        .bind(&loan.customer_email)
        .bind(loan.loan_date)
        .bind(loan.returned)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("loan {}", id)));
        }
        Ok(loan.with_id(id))
    }

    async fn find_by_id(&self, id: LoanId) -> Result<Option<Loan>> {
        let sql = format!("{} WHERE l.id = $1", SELECT_LOANS);
        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    async fn exists_outstanding_for_book(&self, book_id: BookId) -> Result<bool> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM loans
                WHERE book_id = $1 AND (returned IS NULL OR returned = FALSE)
            )
            "#,
        )
        .bind(book_id.value())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn exists_for_book(&self, book_id: BookId) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM loans WHERE book_id = $1)")
            .bind(book_id.value())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    /// ISBN OR 利用者名で検索する
    ///
    /// NULLをバインドした条件は常に偽になるため、未指定の条件は何にも一致しない。
    async fn find_by_isbn_or_customer(
        &self,
        isbn: Option<&str>,
        customer: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Loan>> {
        let isbn = isbn.map(str::to_string);
        let customer = customer.map(str::to_string);

        self.fetch_page(page, |query| {
            query
                .push(" WHERE b.isbn = ")
                .push_bind(isbn.clone())
                .push(" OR l.customer = ")
                .push_bind(customer.clone());
        })
        .await
    }

    async fn find_by_book(&self, book_id: BookId, page: PageRequest) -> Result<Page<Loan>> {
        self.fetch_page(page, |query| {
            query.push(" WHERE l.book_id = ").push_bind(book_id.value());
        })
        .await
    }

    async fn find_outstanding_loaned_before(&self, date: NaiveDate) -> Result<Vec<Loan>> {
        let sql = format!(
            "{} WHERE l.loan_date < $1 AND (l.returned IS NULL OR l.returned = FALSE) \
             ORDER BY l.loan_date, l.id",
            SELECT_LOANS
        );
        let rows = sqlx::query(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(map_row_to_loan).collect()
    }
}
