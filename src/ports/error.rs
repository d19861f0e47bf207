use thiserror::Error;

/// ストアポート共通のエラー
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// 一意制約違反（ISBN重複、未返却貸出の重複など）
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// 外部キー制約違反（貸出から参照されている書籍の削除など）
    #[error("record is still referenced: {0}")]
    Referenced(String),

    /// 更新・削除対象が存在しない
    #[error("record not found: {0}")]
    NotFound(String),

    /// バックエンド（DBドライバなど）のエラー
    #[error("storage backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RepositoryError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepositoryError::Backend(Box::new(err))
    }
}

/// ストアポートの Result型
pub type Result<T> = std::result::Result<T, RepositoryError>;
