use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{Book, LoanId};

/// 貸出期間（日数）
///
/// この日数を超えて未返却の貸出は延滞とみなす。
pub const LOAN_PERIOD_DAYS: u64 = 4;

/// 貸出 - 1冊の書籍の1回の貸出
///
/// 不変条件：1冊の書籍につき未返却の貸出は高々1件。
/// この条件はサービス層の事前チェックとストアの制約で守られる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: Option<LoanId>,
    pub book: Book,
    pub customer: String,
    pub customer_email: Option<String>,
    pub loan_date: NaiveDate,
    /// 未設定 / 返却済み / 未返却 の三値
    pub returned: Option<bool>,
}

impl Loan {
    /// 未永続化の貸出を作成
    pub fn new(book: Book, customer: impl Into<String>, loan_date: NaiveDate) -> Self {
        Self {
            id: None,
            book,
            customer: customer.into(),
            customer_email: None,
            loan_date,
            returned: None,
        }
    }

    pub fn with_customer_email(self, email: impl Into<String>) -> Self {
        Self {
            customer_email: Some(email.into()),
            ..self
        }
    }

    pub fn with_id(self, id: LoanId) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }

    /// 未返却か（returnedがtrueでなければ未返却）
    pub fn is_outstanding(&self) -> bool {
        self.returned != Some(true)
    }

    /// 延滞しているか
    ///
    /// 未返却かつ貸出日が`late_threshold(today)`より前の場合に延滞。
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_outstanding() && self.loan_date < late_threshold(today)
    }
}

/// 延滞判定の基準日（今日から貸出期間を引いた日）
pub fn late_threshold(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(LOAN_PERIOD_DAYS))
        .unwrap_or(NaiveDate::MIN)
}
