//! Representative images from Wikipedia's `pageimages` API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use viajero_core::ImageResolver;

use crate::ClientError;

pub const DEFAULT_WIKIPEDIA_API: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 600;

#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub api_url: String,
    pub thumbnail_size: u32,
    pub timeout: Duration,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_WIKIPEDIA_API.to_string(),
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    query: Option<Query>,
}

#[derive(Deserialize)]
struct Query {
    /// Keyed by page id; missing titles come back under a negative id.
    #[serde(default)]
    pages: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct Page {
    thumbnail: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    source: String,
}

/// Thumbnail URL of the first page in a `pageimages` response, if any.
fn thumbnail_from_body(body: &str) -> Result<Option<String>, ClientError> {
    let parsed: QueryResponse = serde_json::from_str(body)?;
    let query = parsed.query.ok_or(ClientError::Malformed("missing `query` object"))?;
    let Some(first) = query.pages.into_iter().next().map(|(_, page)| page) else {
        return Ok(None);
    };
    let page: Page = serde_json::from_value(first)?;
    Ok(page.thumbnail.map(|t| t.source))
}

/// Looks up page thumbnails by title.
pub struct WikipediaImages {
    client: reqwest::Client,
    settings: ImageSettings,
}

impl WikipediaImages {
    pub fn new(settings: ImageSettings) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { client, settings })
    }

    /// Fetch the thumbnail for a page title. `Ok(None)` when the page has no image.
    pub async fn thumbnail(&self, title: &str) -> Result<Option<String>, ClientError> {
        let size = self.settings.thumbnail_size.to_string();
        let resp = self
            .client
            .get(&self.settings.api_url)
            .query(&[
                ("action", "query"),
                ("prop", "pageimages"),
                ("format", "json"),
                ("pithumbsize", size.as_str()),
                ("origin", "*"),
                ("titles", title),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        thumbnail_from_body(&body)
    }
}

#[async_trait]
impl ImageResolver for WikipediaImages {
    async fn resolve_image(&self, place_name: &str) -> Option<String> {
        let title = place_name.trim();
        if title.is_empty() {
            return None;
        }
        match self.thumbnail(title).await {
            Ok(found) => {
                debug!(title, found = found.is_some(), "image lookup");
                found
            }
            Err(e) => {
                warn!(title, error = %e, "image lookup failed");
                None
            }
        }
    }
}
