pub mod book;
pub mod loan;

use crate::ports::{BookRepository, LoanRepository};
use std::sync::Arc;

/// サービスの依存関係
///
/// 振る舞い（メソッド）は持たず、サービス関数に引数として渡す。
/// すべての依存が明示的になり、テストではインメモリ実装を差し込める。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub book_repository: Arc<dyn BookRepository>,
    pub loan_repository: Arc<dyn LoanRepository>,
}
