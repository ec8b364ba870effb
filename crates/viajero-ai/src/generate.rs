//! Text generation over the Gemini `generateContent` REST endpoint.
//!
//! The normalizer and extractor only see the [`TextGenerator`] trait, so tests
//! can substitute a canned generator without touching the network.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use viajero_core::ServiceError;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no API key configured for the text generator")]
    MissingApiKey,
    #[error("generator returned no text")]
    EmptyResponse,
}

impl From<GenerateError> for ServiceError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::Http(e) => ServiceError::Transport(e.to_string()),
            GenerateError::Server { status, body } => ServiceError::Server { status, body },
            GenerateError::Json(e) => ServiceError::Malformed(e.to_string()),
            GenerateError::MissingApiKey => ServiceError::MissingConfig("GEMINI_API_KEY"),
            GenerateError::EmptyResponse => {
                ServiceError::Malformed("generator returned no text".to_string())
            }
        }
    }
}

/// A single-turn generation request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Generated text plus token accounting.
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub text: String,
    pub tokens_used: u32,
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GenerateError>;
}

/// Connection settings for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// Without a key every call fails with [`GenerateError::MissingApiKey`].
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for Gemini's `generateContent` API.
pub struct GeminiClient {
    client: reqwest::Client,
    settings: GeminiSettings,
}

// ── Wire types ──

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent<'a>>,
    contents: Vec<WireContent<'a>>,
    generation_config: WireGenerationConfig,
}

#[derive(Serialize)]
struct WireContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
struct WirePart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    #[serde(default)]
    usage_metadata: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireCandidateContent>,
}

#[derive(Deserialize)]
struct WireCandidateContent {
    #[serde(default)]
    parts: Vec<WireCandidatePart>,
}

#[derive(Deserialize)]
struct WireCandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUsage {
    #[serde(default)]
    total_token_count: u32,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, GenerateError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { client, settings })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&str> {
        self.settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

fn build_wire_request(request: &GenerateRequest) -> WireRequest<'_> {
    WireRequest {
        system_instruction: request.system_prompt.as_deref().map(|s| WireContent {
            role: None,
            parts: vec![WirePart { text: s }],
        }),
        contents: vec![WireContent {
            role: Some("user"),
            parts: vec![WirePart {
                text: &request.user_prompt,
            }],
        }],
        generation_config: WireGenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        },
    }
}

/// Concatenate the text parts of the first candidate.
fn parse_wire_response(body: &str) -> Result<GenerateResponse, GenerateError> {
    let parsed: WireResponse = serde_json::from_str(body)?;
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerateError::EmptyResponse);
    }

    Ok(GenerateResponse {
        text,
        tokens_used: parsed.usage_metadata.map(|u| u.total_token_count).unwrap_or(0),
    })
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GenerateError> {
        let api_key = self.api_key().ok_or(GenerateError::MissingApiKey)?;
        let url = self.endpoint();

        debug!(url = %url, model = %self.settings.model, "calling text generator");
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&build_wire_request(request))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerateError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let response = parse_wire_response(&body)?;
        info!(tokens = response.tokens_used, "generation complete");
        Ok(response)
    }
}
