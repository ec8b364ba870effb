//! Structured place extraction through a text generator.
//!
//! The model is asked for a bare JSON array, but replies often arrive wrapped
//! in Markdown fences or with a sentence of preamble. [`strip_code_fences`]
//! removes the fences and [`parse_places`] takes the first `[` that opens a
//! valid list of places, so bracketed prose ahead of the array is skipped.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use viajero_core::{EnrichmentOutcome, PlaceCandidate, PlaceExtractor, ServiceError};

use crate::generate::{GenerateRequest, TextGenerator};

const EXTRACT_PROMPT: &str = "\
You extract tourist places from answers written by a Colombian tourism assistant.

Given the answer text, list every tourist attraction, natural site, landmark, town or venue it mentions.
For each one give the city or municipality and the department (region) when the text or common knowledge makes it clear.

Respond ONLY with a JSON array. No markdown fences, no explanation, just raw JSON:
[
  {\"name\": \"place name\", \"city\": \"city\" or null, \"department\": \"department\" or null}
]

If the text mentions no places, respond with [].";

const EXTRACT_MAX_TOKENS: u32 = 1024;

#[derive(Deserialize)]
struct RawPlace {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default, alias = "region")]
    department: Option<String>,
}

/// Remove a surrounding Markdown code fence (with optional info string).
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        // Drop the info string (e.g. `json`) up to the first newline.
        s = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    }
    if let Some(body) = s.trim_end().strip_suffix("```") {
        s = body;
    }
    s.trim()
}

/// The first array in `text` that decodes as a list of places.
///
/// Trailing prose after the array is ignored.
fn first_place_array(text: &str) -> Option<Vec<RawPlace>> {
    text.match_indices('[').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Vec<RawPlace>>()
            .next()?
            .ok()
    })
}

/// Parse a generator reply into place candidates.
///
/// Entries without a usable name are dropped; blank optional fields become
/// `None`.
pub fn parse_places(raw: &str) -> Result<Vec<PlaceCandidate>, ServiceError> {
    let payload = strip_code_fences(raw);
    let parsed = first_place_array(payload).ok_or_else(|| {
        ServiceError::Malformed(format!(
            "place list: no JSON array of places; raw: {}",
            payload.chars().take(200).collect::<String>()
        ))
    })?;

    Ok(parsed
        .into_iter()
        .filter_map(|p| {
            let name = non_blank(p.name)?;
            Some(PlaceCandidate {
                name,
                city: non_blank(p.city),
                department: non_blank(p.department),
            })
        })
        .collect())
}

fn non_blank(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts places by asking a [`TextGenerator`] for structured JSON. Uncapped.
pub struct LlmExtractor {
    generator: Arc<dyn TextGenerator>,
}

impl LlmExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl PlaceExtractor for LlmExtractor {
    async fn extract_places(&self, text: &str) -> EnrichmentOutcome<Vec<PlaceCandidate>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .generator
            .generate(&GenerateRequest {
                system_prompt: Some(EXTRACT_PROMPT.to_string()),
                user_prompt: text.to_string(),
                max_tokens: EXTRACT_MAX_TOKENS,
                temperature: 0.0,
            })
            .await?;

        match parse_places(&response.text) {
            Ok(places) => {
                debug!(count = places.len(), "extracted places");
                Ok(places)
            }
            Err(e) => {
                warn!(error = %e, "could not parse extraction reply");
                Err(e)
            }
        }
    }
}
