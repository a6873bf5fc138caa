use once_cell::sync::Lazy;
use regex::Regex;

use crate::fetcher::{Fetcher, LookupError, MediaKind};

/// Fixed marker the rating is scraped from on the book page.
static RATING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"itemprop="ratingValue"[^>]*>([0-9.]+)"#).unwrap());

/// Community rating site, fetched through a CORS relay passthrough.
pub struct Goodreads {
    base: String,
    relay_base: String,
}

impl Goodreads {
    pub fn new(base: impl Into<String>, relay_base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            relay_base: relay_base.into(),
        }
    }

    pub fn book_url(&self, goodreads_id: &str) -> String {
        format!("{}/book/show/{}", self.base, goodreads_id)
    }

    /// Average rating for a book page, as a two-decimal string. `Ok(None)`
    /// when the page has no rating marker.
    pub async fn fetch_rating(
        &self,
        fetcher: &Fetcher,
        goodreads_id: &str,
    ) -> Result<Option<String>, LookupError> {
        let page = self.book_url(goodreads_id);
        let url = format!("{}{}", self.relay_base, urlencoding::encode(&page));
        let Some(html) = fetcher.get_text(&url, MediaKind::Html).await? else {
            return Ok(None);
        };
        Ok(extract_rating(&html))
    }
}

pub(crate) fn extract_rating(html: &str) -> Option<String> {
    RATING_MARKER
        .captures(html)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .map(|rating| format!("{:.2}", rating))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_rating_from_marker() {
        let html = r#"<span itemprop="ratingValue" content>4.37</span>"#;
        assert_eq!(extract_rating(html).as_deref(), Some("4.37"));
    }

    #[test]
    fn pads_rating_to_two_decimals() {
        let html = r#"<span itemprop="ratingValue">4.5</span>"#;
        assert_eq!(extract_rating(html).as_deref(), Some("4.50"));
    }

    #[test]
    fn missing_marker_yields_none() {
        assert_eq!(extract_rating("<html><body>no ratings here</body></html>"), None);
        assert_eq!(extract_rating(r#"itemprop="ratingValue">"#), None);
    }
}
