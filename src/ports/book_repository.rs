use crate::domain::{Book, BookFilter, BookId, Page, PageRequest};
use async_trait::async_trait;

pub use super::error::Result;

/// 書籍ストアポート
///
/// 書籍の永続化と検索を抽象化する。
/// IDの採番はストアが行う。
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// 書籍を新規保存し、採番済みIDを付与して返す
    ///
    /// ISBNが既に存在する場合は`RepositoryError::Conflict`。
    async fn save(&self, book: Book) -> Result<Book>;

    /// タイトルと著者を更新する（ISBNは変更しない）
    async fn update(&self, id: BookId, book: Book) -> Result<Book>;

    /// 書籍を削除する
    async fn delete(&self, id: BookId) -> Result<()>;

    /// IDで書籍を取得する
    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>>;

    /// ISBNで書籍を取得する
    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>>;

    /// ISBNが登録済みか確認する
    ///
    /// 重複登録の事前チェックに使用される。
    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool>;

    /// 検索条件の全節に一致する書籍をページ単位で返す
    async fn find_matching(&self, filter: &BookFilter, page: PageRequest) -> Result<Page<Book>>;
}
