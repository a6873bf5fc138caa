use serde::Deserialize;

use crate::catalog::{non_empty, Book};
use crate::fetcher::{Fetcher, LookupError, MediaKind};
use crate::identity::{author_last_name, normalize_isbn};

/// Characters of the title that must prefix-match before a free-text search
/// result is trusted with a cover.
const TITLE_PREFIX_LEN: usize = 10;

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    items: Option<Vec<VolumeItem>>,
}

#[derive(Debug, Deserialize)]
struct VolumeItem {
    #[serde(rename = "volumeInfo")]
    volume_info: Option<VolumeInfo>,
}

#[derive(Debug, Deserialize)]
struct VolumeResponse {
    #[serde(rename = "volumeInfo")]
    volume_info: Option<VolumeInfo>,
}

#[derive(Debug, Deserialize, Default)]
struct VolumeInfo {
    title: Option<String>,
    authors: Option<Vec<String>>,
    description: Option<String>,
    #[serde(rename = "imageLinks")]
    image_links: Option<ImageLinks>,
    #[serde(rename = "industryIdentifiers")]
    industry_identifiers: Option<Vec<IndustryIdentifier>>,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    #[serde(rename = "extraLarge")]
    extra_large: Option<String>,
    large: Option<String>,
    thumbnail: Option<String>,
    #[serde(rename = "smallThumbnail")]
    small_thumbnail: Option<String>,
}

impl ImageLinks {
    /// Largest available image, upgraded to https (Google often returns
    /// plain http links).
    fn best(&self) -> Option<String> {
        self.extra_large
            .as_ref()
            .or(self.large.as_ref())
            .or(self.thumbnail.as_ref())
            .or(self.small_thumbnail.as_ref())
            .map(|u| u.replace("http://", "https://"))
    }
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    identifier: Option<String>,
}

/// Primary bibliographic provider (Google Books volumes API).
pub struct GoogleBooks {
    base: String,
}

impl GoogleBooks {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Description lookup, by ISBN when one is available, else by
    /// title/author free text.
    ///
    /// ISBN queries are fuzzy on Google's side, so a result is only accepted
    /// when its identifiers echo the queried ISBN digits or its author list
    /// contains the input author's last name. Title/author queries have no
    /// identifier to cross-check and take the first result as-is.
    pub async fn lookup_description(
        &self,
        fetcher: &Fetcher,
        book: &Book,
    ) -> Result<Option<String>, LookupError> {
        let isbn_query = book.first_isbn();
        let query = match isbn_query {
            Some(isbn) => format!("isbn:{}", urlencoding::encode(isbn)),
            None => {
                let title = non_empty(&book.lookup_title).unwrap_or(&book.title);
                let author_part = non_empty(&book.author)
                    .map(|a| format!("+inauthor:{}", urlencoding::encode(a)))
                    .unwrap_or_default();
                format!("intitle:{}{}", urlencoding::encode(title), author_part)
            }
        };
        let url = format!(
            "{}/volumes?q={}&maxResults=1&fields=items(volumeInfo(title,authors,description,imageLinks,industryIdentifiers))",
            self.base, query
        );

        let Some(parsed) = fetcher.get_json::<VolumesResponse>(&url).await? else {
            return Ok(None);
        };
        let Some(volume) = parsed
            .items
            .and_then(|items| items.into_iter().next())
            .and_then(|item| item.volume_info)
        else {
            return Ok(None);
        };

        if let Some(isbn) = isbn_query {
            if !identifiers_match(&volume, isbn) && !author_matches_last_name(&volume, book) {
                return Ok(None);
            }
        }

        Ok(volume.description)
    }

    /// Cover image of a known volume id, validated before use.
    pub async fn cover_by_volume(
        &self,
        fetcher: &Fetcher,
        volume_id: &str,
    ) -> Result<Option<String>, LookupError> {
        let url = format!(
            "{}/volumes/{}?fields=volumeInfo(imageLinks)",
            self.base,
            urlencoding::encode(volume_id)
        );
        let Some(parsed) = fetcher.get_json::<VolumeResponse>(&url).await? else {
            return Ok(None);
        };
        let Some(thumb) = parsed
            .volume_info
            .and_then(|v| v.image_links)
            .and_then(|links| links.best())
        else {
            return Ok(None);
        };
        fetcher.fetch_validated(&thumb, MediaKind::Image).await
    }

    /// Cover image keyed by ISBN, validated before use.
    pub async fn cover_by_isbn(
        &self,
        fetcher: &Fetcher,
        isbn: &str,
    ) -> Result<Option<String>, LookupError> {
        let url = format!(
            "{}/volumes?q=isbn:{}&maxResults=1&fields=items(id,volumeInfo/imageLinks)",
            self.base,
            urlencoding::encode(isbn)
        );
        let Some(parsed) = fetcher.get_json::<VolumesResponse>(&url).await? else {
            return Ok(None);
        };
        let Some(thumb) = parsed
            .items
            .and_then(|items| items.into_iter().next())
            .and_then(|item| item.volume_info)
            .and_then(|v| v.image_links)
            .and_then(|links| links.best())
        else {
            return Ok(None);
        };
        fetcher.fetch_validated(&thumb, MediaKind::Image).await
    }

    /// Last-resort free-text cover search. Both an author-substring match
    /// and a title-prefix match are required before the image candidate is
    /// even validated; with no strong identifier this is the only guard
    /// against attaching a wrong cover.
    pub async fn cover_by_search(
        &self,
        fetcher: &Fetcher,
        book: &Book,
    ) -> Result<Option<String>, LookupError> {
        let Some(author) = non_empty(&book.author) else {
            return Ok(None);
        };
        if book.title.is_empty() {
            return Ok(None);
        }
        let query = format!(
            "intitle:{}+inauthor:{}",
            urlencoding::encode(&book.title),
            urlencoding::encode(author)
        );
        let url = format!(
            "{}/volumes?q={}&maxResults=1&fields=items(volumeInfo/title,volumeInfo/authors,volumeInfo/imageLinks)",
            self.base, query
        );

        let Some(parsed) = fetcher.get_json::<VolumesResponse>(&url).await? else {
            return Ok(None);
        };
        let Some(volume) = parsed
            .items
            .and_then(|items| items.into_iter().next())
            .and_then(|item| item.volume_info)
        else {
            return Ok(None);
        };

        let author_lower = author.to_lowercase();
        let author_ok = volume
            .authors
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|a| a.to_lowercase().contains(&author_lower));
        let title_prefix: String = book
            .title
            .to_lowercase()
            .chars()
            .take(TITLE_PREFIX_LEN)
            .collect();
        let title_ok = volume
            .title
            .as_deref()
            .unwrap_or_default()
            .to_lowercase()
            .contains(&title_prefix);
        if !author_ok || !title_ok {
            return Ok(None);
        }

        let Some(thumb) = volume.image_links.and_then(|links| links.best()) else {
            return Ok(None);
        };
        fetcher.fetch_validated(&thumb, MediaKind::Image).await
    }
}

fn identifiers_match(volume: &VolumeInfo, queried_isbn: &str) -> bool {
    let wanted = normalize_isbn(queried_isbn);
    if wanted.is_empty() {
        return false;
    }
    volume
        .industry_identifiers
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|id| id.identifier.as_deref())
        .any(|id| normalize_isbn(id).eq_ignore_ascii_case(&wanted))
}

fn author_matches_last_name(volume: &VolumeInfo, book: &Book) -> bool {
    let last = non_empty(&book.author)
        .map(author_last_name)
        .unwrap_or_default();
    if last.is_empty() {
        return false;
    }
    volume
        .authors
        .as_deref()
        .unwrap_or_default()
        .join(" ")
        .to_lowercase()
        .contains(&last)
}
