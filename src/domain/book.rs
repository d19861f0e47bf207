use serde::{Deserialize, Serialize};

use super::BookId;

/// 書籍
///
/// `id`は永続化前は`None`。ISBNは書籍全体で一意。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: Option<BookId>,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

impl Book {
    /// 未永続化の書籍を作成
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            author: author.into(),
            isbn: isbn.into(),
        }
    }

    /// 採番済みIDを付与した書籍を返す
    pub fn with_id(self, id: BookId) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_book_has_no_id() {
        let book = Book::new("Title", "Author", "123");
        assert!(book.id.is_none());
        assert_eq!(book.isbn, "123");
    }

    #[test]
    fn test_with_id_keeps_fields() {
        let book = Book::new("Title", "Author", "123").with_id(BookId::new(1));
        assert_eq!(book.id, Some(BookId::new(1)));
        assert_eq!(book.title, "Title");
        assert_eq!(book.author, "Author");
    }
}
