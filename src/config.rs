use std::env;
use std::path::PathBuf;

/// Default inter-call delay, shared across the whole fallback chain.
const DEFAULT_RATE_LIMIT_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct Config {
    /// JSON catalog rewritten in place by the build tool.
    pub catalog_path: PathBuf,
    /// Directory the catalog's root-relative asset paths resolve against.
    pub site_root: PathBuf,
    /// Where downloaded cover images land.
    pub covers_dir: PathBuf,
    pub rate_limit_ms: u64,

    // Provider endpoints. Overridable so tests can point them at a mock
    // server; the defaults preserve the exact third-party URL shapes.
    pub google_books_base: String,
    pub openlibrary_base: String,
    pub openlibrary_covers_base: String,
    pub goodreads_base: String,
    /// CORS relay prefix the rating page URL gets appended to, URL-encoded.
    pub cors_relay_base: String,
}

impl Config {
    pub fn from_env() -> Self {
        let site_root = PathBuf::from(env::var("SITE_ROOT").unwrap_or_else(|_| ".".to_string()));

        let catalog_path = env::var("BOOKS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| site_root.join("data").join("books.json"));

        let covers_dir = site_root.join("assets").join("covers");

        Self {
            catalog_path,
            site_root,
            covers_dir,
            rate_limit_ms: env::var("RATE_LIMIT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_MS),
            google_books_base: env::var("GOOGLE_BOOKS_BASE")
                .unwrap_or_else(|_| "https://www.googleapis.com/books/v1".to_string()),
            openlibrary_base: env::var("OPENLIBRARY_BASE")
                .unwrap_or_else(|_| "https://openlibrary.org".to_string()),
            openlibrary_covers_base: env::var("OPENLIBRARY_COVERS_BASE")
                .unwrap_or_else(|_| "https://covers.openlibrary.org".to_string()),
            goodreads_base: env::var("GOODREADS_BASE")
                .unwrap_or_else(|_| "https://www.goodreads.com".to_string()),
            cors_relay_base: env::var("CORS_RELAY_BASE")
                .unwrap_or_else(|_| "https://api.allorigins.win/raw?url=".to_string()),
        }
    }
}
