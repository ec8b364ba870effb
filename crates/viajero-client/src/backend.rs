//! HTTP client for the primary answering backend.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use viajero_core::{AnswerBackend, BackendReply, ChatRequest, ServiceError};

use crate::ClientError;

pub const DEFAULT_BACKEND_URL: &str = "https://gemini-backend-ca0r.onrender.com/api/chat";

#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Full chat endpoint, e.g. `http://localhost:3000/api/chat`.
    pub url: String,
    pub timeout: Duration,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Posts chat requests to the answering backend.
pub struct BackendClient {
    client: reqwest::Client,
    url: String,
}

impl BackendClient {
    /// Create a client for the given chat endpoint (trailing slash ignored).
    pub fn new(settings: BackendSettings) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            client,
            url: settings.url.trim_end_matches('/').to_string(),
        })
    }

    /// Send one chat request and decode the reply.
    ///
    /// A body without a string `reply` field is a [`ClientError::Json`] error.
    pub async fn chat(&self, request: &ChatRequest) -> Result<BackendReply, ClientError> {
        info!(
            url = %self.url,
            has_location = request.location.is_some(),
            "sending prompt to backend"
        );
        let resp = self.client.post(&self.url).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let reply: BackendReply = serde_json::from_str(&body)?;
        info!(
            chars = reply.reply.chars().count(),
            inline_places = reply.places.as_ref().map(Vec::len),
            "backend replied"
        );
        Ok(reply)
    }
}

#[async_trait]
impl AnswerBackend for BackendClient {
    async fn answer(&self, request: &ChatRequest) -> Result<BackendReply, ServiceError> {
        Ok(self.chat(request).await?)
    }
}
