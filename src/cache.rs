use dashmap::DashMap;

/// Partial result of a bibliographic metadata lookup.
#[derive(Debug, Clone, Default)]
pub struct BookInfo {
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
}

/// Fully merged detail record for one book, as shown in a details view.
#[derive(Debug, Clone)]
pub struct BookDetails {
    pub title: String,
    pub author: Option<String>,
    pub cover: String,
    pub description: Option<String>,
    pub goodreads_rating: Option<String>,
    pub goodreads_url: Option<String>,
    pub wk_rating: Option<f64>,
}

impl BookDetails {
    pub fn description_text(&self) -> &str {
        self.description
            .as_deref()
            .unwrap_or("No description yet. ISBNs should pull one soon.")
    }

    pub fn goodreads_rating_text(&self) -> String {
        match &self.goodreads_rating {
            Some(rating) => format!("{} / 5", rating),
            None => "N/A".to_string(),
        }
    }

    pub fn wk_rating_text(&self) -> String {
        match self.wk_rating {
            Some(rating) => format!("{:.1} / 5", rating),
            None => "Not rated yet".to_string(),
        }
    }
}

/// Per-process result caches, constructed once and handed to the resolver.
///
/// Three independent maps: metadata lookups and merged details are keyed by
/// the derived identity key, ratings by the rating-site identifier. Rating
/// entries cache `None` too, so a known-unavailable rating is not re-queried.
/// Nothing is ever evicted; the catalog is tens to low hundreds of records.
#[derive(Debug, Default)]
pub struct ResolveCache {
    lookup: DashMap<String, BookInfo>,
    rating: DashMap<String, Option<String>>,
    detail: DashMap<String, BookDetails>,
}

impl ResolveCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup_get(&self, key: &str) -> Option<BookInfo> {
        self.lookup.get(key).map(|entry| entry.clone())
    }

    pub fn lookup_put(&self, key: String, info: BookInfo) {
        self.lookup.insert(key, info);
    }

    /// Outer `None` means "never asked"; `Some(None)` is a cached miss.
    pub fn rating_get(&self, id: &str) -> Option<Option<String>> {
        self.rating.get(id).map(|entry| entry.clone())
    }

    pub fn rating_put(&self, id: String, rating: Option<String>) {
        self.rating.insert(id, rating);
    }

    pub fn detail_get(&self, key: &str) -> Option<BookDetails> {
        self.detail.get(key).map(|entry| entry.clone())
    }

    pub fn detail_put(&self, key: String, details: BookDetails) {
        self.detail.insert(key, details);
    }
}
