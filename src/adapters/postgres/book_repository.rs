use crate::domain::{Book, BookFilter, BookId, MatchClause, Page, PageRequest};
use crate::ports::RepositoryError;
use crate::ports::book_repository::{BookRepository as BookRepositoryTrait, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};

use super::map_sqlx_error;

/// PostgreSQLの行データをBookに変換する
fn map_row_to_book(row: &PgRow) -> Result<Book> {
    let id: i64 = row.try_get("id").map_err(RepositoryError::backend)?;

    Ok(Book {
        id: Some(BookId::new(id)),
        title: row.try_get("title").map_err(RepositoryError::backend)?,
        author: row.try_get("author").map_err(RepositoryError::backend)?,
        isbn: row.try_get("isbn").map_err(RepositoryError::backend)?,
    })
}

/// 述語節をWHERE句として追加する
///
/// 各節は `列 ILIKE '%値%'` となり、ANDで結合される。
fn push_match_clauses(builder: &mut QueryBuilder<'_, Postgres>, clauses: &[MatchClause]) {
    for (i, clause) in clauses.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        builder.push(clause.field.column());
        builder.push(" ILIKE ");
        builder.push_bind(clause.like_pattern());
    }
}

/// BookRepositoryのPostgreSQL実装
pub struct BookRepository {
    pool: PgPool,
}

impl BookRepository {
    /// PostgreSQLコネクションプールから新しいBookRepositoryを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepositoryTrait for BookRepository {
    /// 書籍を保存し、採番されたIDを付与して返す
    ///
    /// books_isbn_key制約の違反は`Conflict`になる。
    async fn save(&self, book: Book) -> Result<Book> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, author, isbn)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(book.with_id(BookId::new(id)))
    }

    async fn update(&self, id: BookId, book: Book) -> Result<Book> {
        let row = sqlx::query(
            r#"
            UPDATE books
            SET title = $2, author = $3
            WHERE id = $1
            RETURNING id, title, author, isbn
            "#,
        )
        .bind(id.value())
        .bind(&book.title)
        .bind(&book.author)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => map_row_to_book(&row),
            None => Err(RepositoryError::NotFound(format!("book {}", id))),
        }
    }

    async fn delete(&self, id: BookId) -> Result<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("book {}", id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query("SELECT id, title, author, isbn FROM books WHERE id = $1")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let row = sqlx::query("SELECT id, title, author, isbn FROM books WHERE isbn = $1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM books WHERE isbn = $1)")
            .bind(isbn)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    /// 検索条件から述語節を組み立てて検索する
    ///
    /// 総件数の取得とページの取得は同じ述語で2回クエリを発行する。
    async fn find_matching(&self, filter: &BookFilter, page: PageRequest) -> Result<Page<Book>> {
        let clauses = filter.clauses();

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books");
        push_match_clauses(&mut count_query, &clauses);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut select_query =
            QueryBuilder::<Postgres>::new("SELECT id, title, author, isbn FROM books");
        push_match_clauses(&mut select_query, &clauses);
        select_query
            .push(" ORDER BY id LIMIT ")
            .push_bind(i64::from(page.size()))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = select_query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let books = rows.iter().map(map_row_to_book).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(books, page, total as u64))
    }
}
