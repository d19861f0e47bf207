pub mod book_repository;
pub mod loan_repository;

// パブリックに型を再エクスポート
pub use book_repository::BookRepository as PostgresBookRepository;
pub use loan_repository::LoanRepository as PostgresLoanRepository;

use crate::ports::RepositoryError;

/// sqlxのエラーをストアポートのエラーに変換する
///
/// 一意制約違反は`Conflict`、外部キー制約違反は`Referenced`として返し、
/// サービス層で業務エラーに読み替える。
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique").to_string();
            return RepositoryError::Conflict(constraint);
        }
        if db_err.is_foreign_key_violation() {
            let constraint = db_err.constraint().unwrap_or("foreign key").to_string();
            return RepositoryError::Referenced(constraint);
        }
    }
    RepositoryError::backend(err)
}
