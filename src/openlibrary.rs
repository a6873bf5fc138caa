use serde::Deserialize;

use crate::fetcher::{Fetcher, LookupError, MediaKind};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkRecord {
    description: Option<WorkDescription>,
}

/// Open Library work descriptions come back either as a plain string or
/// wrapped in a `{"type": …, "value": …}` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkDescription {
    Text(String),
    Wrapped { value: String },
}

impl WorkDescription {
    fn into_text(self) -> String {
        match self {
            WorkDescription::Text(s) => s,
            WorkDescription::Wrapped { value } => value,
        }
    }
}

/// Secondary catalog (Open Library) plus its cover CDN.
pub struct OpenLibrary {
    base: String,
    covers_base: String,
}

impl OpenLibrary {
    pub fn new(base: impl Into<String>, covers_base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            covers_base: covers_base.into(),
        }
    }

    /// Two-step description lookup: find the work key by ISBN, then read the
    /// work record.
    pub async fn lookup_description(
        &self,
        fetcher: &Fetcher,
        isbn: &str,
    ) -> Result<Option<String>, LookupError> {
        let search_url = format!(
            "{}/search.json?isbn={}",
            self.base,
            urlencoding::encode(isbn)
        );
        let Some(results) = fetcher.get_json::<SearchResponse>(&search_url).await? else {
            return Ok(None);
        };
        let Some(work_key) = results.docs.into_iter().next().and_then(|doc| doc.key) else {
            return Ok(None);
        };

        let work_url = format!("{}{}.json", self.base, work_key);
        let Some(work) = fetcher.get_json::<WorkRecord>(&work_url).await? else {
            return Ok(None);
        };
        Ok(work.description.map(WorkDescription::into_text))
    }

    /// Cover CDN lookup by ISBN. `default=false` makes a missing cover a
    /// 404 instead of a blank placeholder image.
    pub async fn cover_by_isbn(
        &self,
        fetcher: &Fetcher,
        isbn: &str,
    ) -> Result<Option<String>, LookupError> {
        let url = format!("{}/b/isbn/{}-L.jpg?default=false", self.covers_base, isbn);
        fetcher.fetch_validated(&url, MediaKind::Image).await
    }

    /// Cover CDN lookup by Open Library edition id.
    pub async fn cover_by_olid(
        &self,
        fetcher: &Fetcher,
        olid: &str,
    ) -> Result<Option<String>, LookupError> {
        let url = format!("{}/b/olid/{}-L.jpg?default=false", self.covers_base, olid);
        fetcher.fetch_validated(&url, MediaKind::Image).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_description_handles_both_shapes() {
        let plain: WorkRecord = serde_json::from_str(r#"{"description":"A desert planet."}"#).unwrap();
        assert_eq!(
            plain.description.map(WorkDescription::into_text).as_deref(),
            Some("A desert planet.")
        );

        let wrapped: WorkRecord = serde_json::from_str(
            r#"{"description":{"type":"/type/text","value":"A desert planet."}}"#,
        )
        .unwrap();
        assert_eq!(
            wrapped.description.map(WorkDescription::into_text).as_deref(),
            Some("A desert planet.")
        );

        let missing: WorkRecord = serde_json::from_str(r#"{"title":"Dune"}"#).unwrap();
        assert!(missing.description.is_none());
    }
}
