use crate::catalog::{non_empty, Book};

/// Stable cache key for a book record.
///
/// First non-empty identifier wins: ISBN-13, ISBN-10, bare ISBN, catalog id,
/// then a `title|author` fallback. Total and deterministic, so two records
/// with the same identifiers share one resolution.
pub fn derive_key(book: &Book) -> String {
    non_empty(&book.isbn13)
        .or_else(|| non_empty(&book.isbn10))
        .or_else(|| non_empty(&book.isbn))
        .or_else(|| non_empty(&book.id))
        .map(String::from)
        .unwrap_or_else(|| {
            format!(
                "{}|{}",
                book.title,
                book.author.as_deref().unwrap_or_default()
            )
        })
}

/// Strip everything but digits and the `X` check character so hyphenated and
/// bare ISBN forms compare equal. The check character keeps its case: the
/// result is also used verbatim in cover CDN URLs, and comparisons are
/// case-insensitive at the call site.
pub fn normalize_isbn(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || c.eq_ignore_ascii_case(&'X'))
        .collect()
}

/// Lowercased last whitespace token of an author name, used for fuzzy
/// cross-checks against provider author lists.
pub fn author_last_name(author: &str) -> String {
    author
        .split_whitespace()
        .last()
        .map(str::to_lowercase)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_isbn_strips_separators() {
        assert_eq!(
            normalize_isbn("978-0-13-468599-1"),
            normalize_isbn("9780134685991")
        );
        assert_eq!(normalize_isbn(""), "");
    }

    #[test]
    fn normalize_isbn_preserves_check_character_case() {
        assert_eq!(normalize_isbn("0-8044-2957-x"), "080442957x");
        assert_eq!(normalize_isbn("0-8044-2957-X"), "080442957X");
    }

    #[test]
    fn derive_key_prefers_isbn13() {
        let book = Book {
            title: "Dune".to_string(),
            author: Some("Frank Herbert".to_string()),
            isbn13: Some("9780441013593".to_string()),
            isbn10: Some("0441013597".to_string()),
            id: Some("53732".to_string()),
            ..Default::default()
        };
        assert_eq!(derive_key(&book), "9780441013593");
    }

    #[test]
    fn derive_key_skips_empty_identifiers() {
        let book = Book {
            title: "Dune".to_string(),
            isbn13: Some(String::new()),
            isbn10: Some("0441013597".to_string()),
            ..Default::default()
        };
        assert_eq!(derive_key(&book), "0441013597");
    }

    #[test]
    fn derive_key_falls_back_to_title_author() {
        let book = Book {
            title: "Unknown Book".to_string(),
            ..Default::default()
        };
        assert_eq!(derive_key(&book), "Unknown Book|");
    }

    #[test]
    fn author_last_name_takes_last_token() {
        assert_eq!(author_last_name("Frank Herbert"), "herbert");
        assert_eq!(author_last_name("  Ursula K. Le Guin "), "guin");
        assert_eq!(author_last_name(""), "");
    }
}
