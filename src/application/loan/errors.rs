use crate::ports::RepositoryError;
use thiserror::Error;

/// 貸出管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LoanApplicationError {
    /// 書籍に未返却の貸出がある
    #[error("Book already loaned")]
    BookAlreadyLoaned,

    /// 呼び出し側の誤用（IDのない貸出の更新など）
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// ストアのエラー
    #[error("Loan repository error")]
    RepositoryError(#[source] RepositoryError),
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LoanApplicationError>;
