use crate::domain::{BookId, Loan, LoanId, Page, PageRequest};
use async_trait::async_trait;
use chrono::NaiveDate;

pub use super::error::Result;

/// 貸出ストアポート
///
/// 貸出は書籍を参照するが所有はしない。
/// 取得系のメソッドは参照先の書籍を含めた`Loan`を返す。
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// 貸出を新規保存し、採番済みIDを付与して返す
    ///
    /// 同じ書籍に未返却の貸出がある場合は`RepositoryError::Conflict`。
    async fn save(&self, loan: Loan) -> Result<Loan>;

    /// 貸出の状態を更新する（返却フラグの設定など）
    async fn update(&self, id: LoanId, loan: Loan) -> Result<Loan>;

    /// IDで貸出を取得する
    async fn find_by_id(&self, id: LoanId) -> Result<Option<Loan>>;

    /// 書籍に未返却の貸出があるか確認する
    ///
    /// returnedがNULLまたはfalseの貸出を未返却とみなす。
    async fn exists_outstanding_for_book(&self, book_id: BookId) -> Result<bool>;

    /// 書籍を参照する貸出が1件でもあるか確認する（返却済みを含む）
    async fn exists_for_book(&self, book_id: BookId) -> Result<bool>;

    /// 書籍ISBNの一致 OR 利用者名の一致で検索する
    ///
    /// `None`の条件は何にも一致しない。
    async fn find_by_isbn_or_customer(
        &self,
        isbn: Option<&str>,
        customer: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Loan>>;

    /// 書籍の全貸出をページ単位で返す
    async fn find_by_book(&self, book_id: BookId, page: PageRequest) -> Result<Page<Loan>>;

    /// 貸出日が`date`より前の未返却貸出を返す
    ///
    /// 延滞貸出の抽出に使用される。
    async fn find_outstanding_loaned_before(&self, date: NaiveDate) -> Result<Vec<Loan>>;
}
