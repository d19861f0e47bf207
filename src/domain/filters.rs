use serde::{Deserialize, Serialize};

use super::{Book, Loan};

/// 部分一致検索の対象フィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookField {
    Title,
    Author,
    Isbn,
}

impl BookField {
    /// 対応するbooksテーブルの列名
    pub fn column(&self) -> &'static str {
        match self {
            BookField::Title => "title",
            BookField::Author => "author",
            BookField::Isbn => "isbn",
        }
    }

    pub fn value_of<'a>(&self, book: &'a Book) -> &'a str {
        match self {
            BookField::Title => &book.title,
            BookField::Author => &book.author,
            BookField::Isbn => &book.isbn,
        }
    }
}

/// 述語節：指定フィールドが`needle`を含む（大文字小文字を区別しない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchClause {
    pub field: BookField,
    pub needle: String,
}

impl MatchClause {
    pub fn matches(&self, book: &Book) -> bool {
        self.field
            .value_of(book)
            .to_lowercase()
            .contains(&self.needle.to_lowercase())
    }

    /// ILIKE用のパターン。ワイルドカード文字はエスケープする。
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.needle.len() + 2);
        pattern.push('%');
        for c in self.needle.chars() {
            if matches!(c, '\\' | '%' | '_') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

/// 書籍の検索条件
///
/// 値のあるフィールドごとに`MatchClause`を1つ生成し、すべてをANDで結合する。
/// 未指定または空文字のフィールドはワイルドカード扱い。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

impl BookFilter {
    pub fn clauses(&self) -> Vec<MatchClause> {
        [
            (BookField::Title, &self.title),
            (BookField::Author, &self.author),
            (BookField::Isbn, &self.isbn),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            non_blank(value).map(|needle| MatchClause {
                field,
                needle: needle.to_string(),
            })
        })
        .collect()
    }

    pub fn matches(&self, book: &Book) -> bool {
        self.clauses().iter().all(|clause| clause.matches(book))
    }
}

/// 貸出の検索条件
///
/// 書籍ISBNの一致 OR 利用者名の一致。どちらも完全一致。
/// 未指定の条件は何にも一致しないため、両方未指定なら結果は空。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanFilter {
    pub isbn: Option<String>,
    pub customer: Option<String>,
}

impl LoanFilter {
    pub fn isbn(&self) -> Option<&str> {
        non_blank(&self.isbn)
    }

    pub fn customer(&self) -> Option<&str> {
        non_blank(&self.customer)
    }

    pub fn is_empty(&self) -> bool {
        self.isbn().is_none() && self.customer().is_none()
    }

    pub fn matches(&self, loan: &Loan) -> bool {
        let by_isbn = self.isbn().is_some_and(|isbn| loan.book.isbn == isbn);
        let by_customer = self
            .customer()
            .is_some_and(|customer| loan.customer == customer);
        by_isbn || by_customer
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
