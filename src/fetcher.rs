use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;

/// Content-type family a validated fetch must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Html,
}

impl MediaKind {
    fn prefix(self) -> &'static str {
        match self {
            MediaKind::Image => "image/",
            MediaKind::Html => "text/html",
        }
    }
}

/// Transient lookup failures. Not-found and validation rejections are not
/// errors; they travel as `Ok(None)` through the chain.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// HTTP client with a shared inter-call throttle.
///
/// Every outbound call, winning or not, is followed by a fixed delay while
/// the throttle is held, so concurrent resolution tasks still respect the
/// third-party rate limits as one global budget.
pub struct Fetcher {
    client: reqwest::Client,
    delay: Duration,
    throttle: Mutex<()>,
}

impl Fetcher {
    pub fn new(rate_limit_ms: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            delay: Duration::from_millis(rate_limit_ms),
            throttle: Mutex::new(()),
        })
    }

    async fn throttled_get(&self, url: &str) -> Result<reqwest::Response, LookupError> {
        let _slot = self.throttle.lock().await;
        let result = self.client.get(url).send().await;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        result.map_err(|source| LookupError::Network {
            url: url.to_string(),
            source,
        })
    }

    /// GET `url` following redirects; return it back only when the response
    /// is 2xx and carries the expected content-type family.
    pub async fn fetch_validated(
        &self,
        url: &str,
        kind: MediaKind,
    ) -> Result<Option<String>, LookupError> {
        let resp = self.throttled_get(url).await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        if !content_type(&resp).starts_with(kind.prefix()) {
            return Ok(None);
        }
        Ok(Some(url.to_string()))
    }

    /// JSON provider payload; non-2xx is a plain not-found.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, LookupError> {
        let resp = self.throttled_get(url).await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let body = resp.text().await.map_err(|source| LookupError::Network {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|source| LookupError::Decode {
                url: url.to_string(),
                source,
            })
    }

    /// Page body for marker extraction, validated as HTML.
    pub async fn get_text(
        &self,
        url: &str,
        kind: MediaKind,
    ) -> Result<Option<String>, LookupError> {
        let resp = self.throttled_get(url).await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        if !content_type(&resp).starts_with(kind.prefix()) {
            return Ok(None);
        }
        let body = resp.text().await.map_err(|source| LookupError::Network {
            url: url.to_string(),
            source,
        })?;
        Ok(Some(body))
    }

    /// Image bytes plus content-type, for download mode.
    pub async fn fetch_image_bytes(
        &self,
        url: &str,
    ) -> Result<Option<(Vec<u8>, String)>, LookupError> {
        let resp = self.throttled_get(url).await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let content_type = content_type(&resp).to_string();
        if !content_type.starts_with(MediaKind::Image.prefix()) {
            return Ok(None);
        }
        let bytes = resp.bytes().await.map_err(|source| LookupError::Network {
            url: url.to_string(),
            source,
        })?;
        Ok(Some((bytes.to_vec(), content_type)))
    }
}

fn content_type(resp: &reqwest::Response) -> &str {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
