use std::path::PathBuf;

use crate::cache::{BookDetails, BookInfo, ResolveCache};
use crate::catalog::{
    mime_to_ext, non_empty, normalize_cover_path, slugify, Book, COVERS_WEB_DIR,
};
use crate::config::Config;
use crate::fetcher::{Fetcher, LookupError, MediaKind};
use crate::goodreads::Goodreads;
use crate::google_books::GoogleBooks;
use crate::identity::derive_key;
use crate::openlibrary::OpenLibrary;

/// Sentinel cover used when no local or remote image could be resolved.
pub const PLACEHOLDER_COVER: &str = "/assets/covers/placeholder.svg";

/// Build-tool mode: record validated URLs only, or also store the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Metadata,
    Download,
}

/// One attempt in the cover fallback chain. Precedence is the declaration
/// order of `cover_plan`: higher entries are more authoritative, the
/// free-text search is the broadest and always last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverSource {
    /// Revalidate a previously recorded remote URL.
    RemoteUrl(String),
    OpenLibraryIsbn(String),
    OpenLibraryOlid(String),
    GoogleVolume(String),
    GoogleIsbn(String),
    TitleAuthorSearch,
}

/// Ordered attempt plan for a record, skipping sources whose identifier is
/// absent. Pure, so ordering is testable without any network.
pub fn cover_plan(book: &Book) -> Vec<CoverSource> {
    let isbns: Vec<String> = [&book.isbn13, &book.isbn10, &book.isbn]
        .into_iter()
        .filter_map(non_empty)
        .map(crate::identity::normalize_isbn)
        .filter(|isbn| !isbn.is_empty())
        .collect();

    let mut plan = Vec::new();

    if let Some(url) = non_empty(&book.cover_remote) {
        plan.push(CoverSource::RemoteUrl(url.to_string()));
    }
    for isbn in &isbns {
        plan.push(CoverSource::OpenLibraryIsbn(isbn.clone()));
    }
    if let Some(olid) = non_empty(&book.olid) {
        plan.push(CoverSource::OpenLibraryOlid(olid.to_string()));
    }
    if let Some(volume_id) = non_empty(&book.google_volume_id) {
        plan.push(CoverSource::GoogleVolume(volume_id.to_string()));
    }
    for isbn in &isbns {
        plan.push(CoverSource::GoogleIsbn(isbn.clone()));
    }
    if !book.title.is_empty() && non_empty(&book.author).is_some() {
        plan.push(CoverSource::TitleAuthorSearch);
    }

    plan
}

/// Multi-source metadata and cover resolution.
///
/// Owns the providers, the shared rate-limited fetcher and the injected
/// result caches. Methods take `&self`; the caches are concurrent maps, so
/// runtime callers may resolve several books at once while each book's own
/// chain stays sequential.
pub struct Resolver {
    fetcher: Fetcher,
    google: GoogleBooks,
    openlibrary: OpenLibrary,
    goodreads: Goodreads,
    cache: ResolveCache,
    site_root: PathBuf,
    covers_dir: PathBuf,
}

impl Resolver {
    pub fn new(config: &Config, cache: ResolveCache) -> Result<Self, reqwest::Error> {
        Ok(Self {
            fetcher: Fetcher::new(config.rate_limit_ms)?,
            google: GoogleBooks::new(config.google_books_base.clone()),
            openlibrary: OpenLibrary::new(
                config.openlibrary_base.clone(),
                config.openlibrary_covers_base.clone(),
            ),
            goodreads: Goodreads::new(
                config.goodreads_base.clone(),
                config.cors_relay_base.clone(),
            ),
            cache,
            site_root: config.site_root.clone(),
            covers_dir: config.covers_dir.clone(),
        })
    }

    /// Local short-circuit: an existing `coverOverride` always wins; failing
    /// that, an already-local cover whose file is still present is kept.
    /// `None` just means "continue to remote resolution".
    pub async fn resolve_local(&self, book: &Book) -> Option<String> {
        if let Some(override_path) = non_empty(&book.cover_override) {
            let normalized = normalize_cover_path(override_path);
            if self.local_exists(&normalized).await {
                return Some(normalized);
            }
            tracing::warn!("coverOverride missing, using placeholder: {}", override_path);
        }

        if let Some(cover) = non_empty(&book.cover) {
            if cover.starts_with('/') && self.local_exists(cover).await {
                return Some(cover.to_string());
            }
        }

        None
    }

    async fn local_exists(&self, root_relative: &str) -> bool {
        let path = self.site_root.join(root_relative.trim_start_matches('/'));
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    /// Run the cover fallback chain, first accepted result wins. Transient
    /// provider errors are logged and treated as not-found; exhaustion
    /// returns `None`, never an error.
    pub async fn resolve_remote_cover(&self, book: &Book) -> Option<String> {
        for source in cover_plan(book) {
            match self.attempt_cover(&source, book).await {
                Ok(Some(url)) => return Some(url),
                Ok(None) => {}
                Err(e) => tracing::warn!("cover lookup failed ({:?}): {}", source, e),
            }
        }
        None
    }

    async fn attempt_cover(
        &self,
        source: &CoverSource,
        book: &Book,
    ) -> Result<Option<String>, LookupError> {
        match source {
            CoverSource::RemoteUrl(url) => {
                self.fetcher.fetch_validated(url, MediaKind::Image).await
            }
            CoverSource::OpenLibraryIsbn(isbn) => {
                self.openlibrary.cover_by_isbn(&self.fetcher, isbn).await
            }
            CoverSource::OpenLibraryOlid(olid) => {
                self.openlibrary.cover_by_olid(&self.fetcher, olid).await
            }
            CoverSource::GoogleVolume(volume_id) => {
                self.google.cover_by_volume(&self.fetcher, volume_id).await
            }
            CoverSource::GoogleIsbn(isbn) => {
                self.google.cover_by_isbn(&self.fetcher, isbn).await
            }
            CoverSource::TitleAuthorSearch => {
                self.google.cover_by_search(&self.fetcher, book).await
            }
        }
    }

    /// Descriptive metadata for a record: Google Books first, Open Library
    /// work description as fallback. Cached by the derived identity key.
    pub async fn lookup_info(&self, book: &Book) -> BookInfo {
        let key = derive_key(book);
        if let Some(hit) = self.cache.lookup_get(&key) {
            return hit;
        }

        let mut info = BookInfo {
            title: book.title.clone(),
            author: book.author.clone(),
            description: None,
        };

        match self.google.lookup_description(&self.fetcher, book).await {
            Ok(description) => info.description = description,
            Err(e) => tracing::warn!("book lookup failed: {}", e),
        }

        if info.description.is_none() {
            if let Some(isbn) = book.first_isbn() {
                match self.openlibrary.lookup_description(&self.fetcher, isbn).await {
                    Ok(description) => info.description = description,
                    Err(e) => tracing::warn!("Open Library lookup failed: {}", e),
                }
            }
        }

        self.cache.lookup_put(key, info.clone());
        info
    }

    /// Optional community rating. `None` when the record has no rating-site
    /// identifier; misses are cached so they are not re-queried.
    pub async fn goodreads_rating(&self, book: &Book) -> Option<String> {
        let id = book.rating_id()?;
        if let Some(cached) = self.cache.rating_get(id) {
            return cached;
        }

        let rating = match self.goodreads.fetch_rating(&self.fetcher, id).await {
            Ok(rating) => rating,
            Err(e) => {
                tracing::warn!("rating lookup failed for {}: {}", id, e);
                None
            }
        };
        self.cache.rating_put(id.to_string(), rating.clone());
        rating
    }

    /// Merged detail record, first non-empty field wins over the raw record.
    /// Cached whole, so reopening the same book skips the entire pipeline.
    pub async fn book_details(&self, book: &Book) -> BookDetails {
        let key = derive_key(book);
        if let Some(hit) = self.cache.detail_get(&key) {
            return hit;
        }

        let info = self.lookup_info(book).await;
        let goodreads_rating = self.goodreads_rating(book).await;

        let details = BookDetails {
            title: book.title.clone(),
            author: book.author.clone(),
            cover: non_empty(&book.cover)
                .unwrap_or(PLACEHOLDER_COVER)
                .to_string(),
            description: book.description.clone().or(info.description),
            goodreads_rating,
            goodreads_url: book.rating_id().map(|id| self.goodreads.book_url(id)),
            wk_rating: book.wk_rating,
        };
        self.cache.detail_put(key, details.clone());
        details
    }

    /// Build-time catalog walk. Strictly sequential: the fetcher delay is a
    /// shared global throttle and reordering it across records would defeat
    /// the rate limit accounting.
    pub async fn process_catalog(&self, books: &mut [Book], mode: RunMode) {
        for book in books.iter_mut() {
            self.process_book(book, mode).await;
        }
    }

    /// Resolve one record in place: local check, placeholder default, remote
    /// chain, and in download mode a fetch-and-store of the winning image.
    pub async fn process_book(&self, book: &mut Book, mode: RunMode) {
        if let Some(local) = self.resolve_local(book).await {
            book.cover = Some(local);
            return;
        }

        book.cover = Some(PLACEHOLDER_COVER.to_string());

        let remote = self.resolve_remote_cover(book).await;
        book.cover_remote = remote.clone();

        if mode == RunMode::Download {
            if let Some(url) = &remote {
                match self.download_cover(url, &slugify(book)).await {
                    Ok(Some(local)) => book.cover = Some(local),
                    Ok(None) => {}
                    Err(e) => tracing::warn!("failed downloading {}: {}", url, e),
                }
            }
        }
    }

    async fn download_cover(
        &self,
        url: &str,
        slug: &str,
    ) -> Result<Option<String>, LookupError> {
        let Some((bytes, content_type)) = self.fetcher.fetch_image_bytes(url).await? else {
            return Ok(None);
        };
        let filename = format!("{}.{}", slug, mime_to_ext(&content_type));
        let dest = self.covers_dir.join(&filename);
        if let Err(e) = tokio::fs::write(&dest, &bytes).await {
            tracing::warn!("could not write {}: {}", dest.display(), e);
            return Ok(None);
        }
        Ok(Some(normalize_cover_path(&format!(
            "{}/{}",
            COVERS_WEB_DIR, filename
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_plan_orders_sources_by_precedence() {
        let book = Book {
            title: "Dune".to_string(),
            author: Some("Frank Herbert".to_string()),
            isbn13: Some("978-0-441-01359-3".to_string()),
            isbn10: Some("0441013597".to_string()),
            olid: Some("OL7524342M".to_string()),
            google_volume_id: Some("B1hSG45JCX0C".to_string()),
            cover_remote: Some("https://example.com/dune.jpg".to_string()),
            ..Default::default()
        };

        assert_eq!(
            cover_plan(&book),
            vec![
                CoverSource::RemoteUrl("https://example.com/dune.jpg".to_string()),
                CoverSource::OpenLibraryIsbn("9780441013593".to_string()),
                CoverSource::OpenLibraryIsbn("0441013597".to_string()),
                CoverSource::OpenLibraryOlid("OL7524342M".to_string()),
                CoverSource::GoogleVolume("B1hSG45JCX0C".to_string()),
                CoverSource::GoogleIsbn("9780441013593".to_string()),
                CoverSource::GoogleIsbn("0441013597".to_string()),
                CoverSource::TitleAuthorSearch,
            ]
        );
    }

    #[test]
    fn cover_plan_skips_absent_identifiers() {
        let bare = Book {
            title: "Unknown Book".to_string(),
            ..Default::default()
        };
        assert!(cover_plan(&bare).is_empty());

        let titled = Book {
            title: "Unknown Book".to_string(),
            author: Some("Jane Doe".to_string()),
            ..Default::default()
        };
        assert_eq!(cover_plan(&titled), vec![CoverSource::TitleAuthorSearch]);
    }
}
