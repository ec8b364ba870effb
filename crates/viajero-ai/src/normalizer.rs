//! Response text normalization: LLM rewrite or whitespace cleanup.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;
use viajero_core::{EnrichmentOutcome, ServiceError, TextNormalizer};

use crate::generate::{GenerateRequest, TextGenerator};

// ── Prompt templates ──

const REFORMAT_PROMPT: &str = "\
You are an editor for a tourism assistant. Rewrite the text you are given so it is easier to read.

Rules:
- Use shorter sentences.
- When the text enumerates items (places, steps, tips), render them as a bullet list.
- Do not add facts, names, prices or recommendations that are not in the text.
- Do not remove facts.
- Keep the same language as the input.

Respond ONLY with the rewritten text. No preamble, no explanation.";

const REFORMAT_MAX_TOKENS: u32 = 2048;

/// Rewrites answers through a [`TextGenerator`].
pub struct LlmNormalizer {
    generator: Arc<dyn TextGenerator>,
}

impl LlmNormalizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl TextNormalizer for LlmNormalizer {
    async fn normalize(&self, text: &str) -> EnrichmentOutcome<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let response = self
            .generator
            .generate(&GenerateRequest {
                system_prompt: Some(REFORMAT_PROMPT.to_string()),
                user_prompt: text.to_string(),
                max_tokens: REFORMAT_MAX_TOKENS,
                temperature: 0.2,
            })
            .await?;

        let rewritten = response.text.trim();
        if rewritten.is_empty() {
            return Err(ServiceError::Malformed("empty rewrite".to_string()));
        }
        debug!(
            before = text.len(),
            after = rewritten.len(),
            tokens = response.tokens_used,
            "normalized response text"
        );
        Ok(rewritten.to_string())
    }
}

static HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("valid regex"));
static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Collapse runs of spaces/tabs, trim each line and squeeze blank lines.
///
/// Paragraph breaks survive as a single blank line.
pub fn collapse_whitespace(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .map(|line| HORIZONTAL_WS.replace_all(line.trim(), " ").into_owned())
        .collect();
    BLANK_RUNS
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

/// Offline normalizer. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceNormalizer;

#[async_trait]
impl TextNormalizer for WhitespaceNormalizer {
    async fn normalize(&self, text: &str) -> EnrichmentOutcome<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }
        Ok(collapse_whitespace(text))
    }
}
