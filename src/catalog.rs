use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root-relative web path of the covers directory.
pub const COVERS_WEB_DIR: &str = "assets/covers";

/// One entry of the book catalog (`data/books.json`).
///
/// Unknown fields are kept in `extra` so a rewrite of the catalog never
/// drops presentation data the pipeline does not know about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn13: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn10: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goodreads_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub olid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_volume_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    /// Last validated remote cover URL. Serialized even when `null` so the
    /// catalog records that resolution ran and found nothing.
    pub cover_remote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_override: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wk_rating: Option<f64>,
    /// Alternate title to use for free-text lookups, e.g. without a series
    /// suffix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_title: Option<String>,

    // Presentation fields the pipeline passes through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Book {
    /// First non-empty ISBN in precedence order, as stored in the catalog.
    pub fn first_isbn(&self) -> Option<&str> {
        non_empty(&self.isbn13)
            .or_else(|| non_empty(&self.isbn10))
            .or_else(|| non_empty(&self.isbn))
    }

    /// Identifier used for rating-site lookups. `id` doubles as the
    /// Goodreads id when no dedicated one is set.
    pub fn rating_id(&self) -> Option<&str> {
        non_empty(&self.goodreads_id).or_else(|| non_empty(&self.id))
    }
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not write catalog {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub async fn load_catalog(path: &Path) -> Result<Vec<Book>, CatalogError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Whole-file rewrite with stable two-space formatting and a trailing
/// newline, so an unchanged catalog round-trips byte-identical.
pub async fn save_catalog(path: &Path, books: &[Book]) -> Result<(), CatalogError> {
    let mut out = serde_json::to_string_pretty(books).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    out.push('\n');
    tokio::fs::write(path, out)
        .await
        .map_err(|source| CatalogError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Filesystem-safe slug for a downloaded cover, built from title, author and
/// ISBN, capped at 80 characters.
pub fn slugify(book: &Book) -> String {
    let title = if book.title.is_empty() {
        "book"
    } else {
        &book.title
    };
    let author = non_empty(&book.author).unwrap_or("author");
    let isbn = book.first_isbn().unwrap_or("");

    let raw = if isbn.is_empty() {
        format!("{}-{}", title, author)
    } else {
        format!("{}-{}-{}", title, author, isbn)
    };

    let mut slug = String::new();
    for ch in raw.chars().flat_map(|c| c.to_lowercase()) {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug.chars().take(80).collect()
}

/// Catalog cover paths are always root-relative with a leading slash.
pub fn normalize_cover_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// File extension for a downloaded image, from its `content-type`.
pub fn mime_to_ext(content_type: &str) -> &'static str {
    if content_type.contains("png") {
        "png"
    } else if content_type.contains("webp") {
        "webp"
    } else if content_type.contains("svg") {
        "svg"
    } else {
        "jpg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(title: &str, author: Option<&str>, isbn13: Option<&str>) -> Book {
        Book {
            title: title.to_string(),
            author: author.map(String::from),
            isbn13: isbn13.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn slugify_combines_title_author_isbn() {
        let b = book("Dune", Some("Frank Herbert"), Some("9780441013593"));
        assert_eq!(slugify(&b), "dune-frank-herbert-9780441013593");
    }

    #[test]
    fn slugify_collapses_punctuation_and_caps_length() {
        let b = book("Hello, World!! (Series #1)", Some("Jo Doe"), None);
        assert_eq!(slugify(&b), "hello-world-series-1-jo-doe");

        let long = book(&"x".repeat(200), Some("a"), None);
        assert_eq!(slugify(&long).len(), 80);
    }

    #[test]
    fn mime_to_ext_defaults_to_jpg() {
        assert_eq!(mime_to_ext("image/png"), "png");
        assert_eq!(mime_to_ext("image/webp"), "webp");
        assert_eq!(mime_to_ext("image/svg+xml"), "svg");
        assert_eq!(mime_to_ext("image/jpeg"), "jpg");
        assert_eq!(mime_to_ext(""), "jpg");
    }

    #[test]
    fn normalize_cover_path_adds_leading_slash() {
        assert_eq!(normalize_cover_path("assets/covers/a.jpg"), "/assets/covers/a.jpg");
        assert_eq!(normalize_cover_path("/assets/covers/a.jpg"), "/assets/covers/a.jpg");
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let raw = r#"[{"title":"Dune","coverRemote":null,"series":"Dune Saga","featured":true}]"#;
        let books: Vec<Book> = serde_json::from_str(raw).unwrap();
        assert_eq!(books[0].extra.get("series").unwrap(), "Dune Saga");

        let out = serde_json::to_string(&books).unwrap();
        assert!(out.contains("\"series\":\"Dune Saga\""));
        assert!(out.contains("\"coverRemote\":null"));
    }
}
