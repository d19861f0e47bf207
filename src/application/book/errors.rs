use crate::ports::RepositoryError;
use thiserror::Error;

/// 書籍管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum BookApplicationError {
    /// ISBNが登録済み
    #[error("ISBN already registered")]
    DuplicateIsbn,

    /// 貸出履歴のある書籍は削除できない
    #[error("Book has loans and cannot be deleted")]
    BookHasLoans,

    /// 呼び出し側の誤用（IDのない書籍の更新・削除など）
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// ストアのエラー
    #[error("Book repository error")]
    RepositoryError(#[source] RepositoryError),
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, BookApplicationError>;
