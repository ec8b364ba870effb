//! Offline place extraction from capitalised phrases.
//!
//! Works without any model: proper nouns in Spanish tourism answers are
//! capitalised, and multi-word names are joined by lowercase connectors
//! ("Catedral de Sal", "Parque Nacional Natural Tayrona"). Sentence starters
//! and generic nouns are filtered with a stop-list.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;
use viajero_core::{EnrichmentOutcome, PlaceCandidate, PlaceExtractor};

pub const DEFAULT_PLACE_LIMIT: usize = 3;

static CAPITALISED_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\p{Lu}\p{Ll}+(?:\s+(?:(?:de|del|la|las|los|el)\s+)*\p{Lu}\p{Ll}+)*\b")
        .expect("valid regex")
});

/// Words that are capitalised for grammatical reasons, or too generic to be a place.
const STOP_WORDS: &[&str] = &[
    // Generic tourism vocabulary.
    "colombia", "turismo", "historia", "región", "cultura", "visita", "lugar", "sitio",
    // Sentence starters.
    "el", "la", "los", "las", "un", "una", "en", "de", "del", "te", "si", "sí", "no", "es",
    "para", "por", "con", "sin", "su", "sus", "este", "esta", "estos", "estas", "ese", "esa",
    "allí", "aquí", "hay", "muy", "como", "cuando", "donde", "desde", "hasta", "también",
    "además", "puedes", "recomiendo", "otro", "otra", "otros", "otras", "algunos", "algunas",
    "hola", "claro", "luego", "primero", "finalmente", "ideal", "mejor", "cerca", "durante",
    "entre", "ahí", "pero", "and", "the", "this", "there", "you", "if", "in", "for",
];

/// Articles that can open a place name ("La Candelaria", "Los Nevados").
const ARTICLES: &[&str] = &["el", "la", "los", "las"];

fn is_stop_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    STOP_WORDS.contains(&lower.as_str())
}

fn is_article(word: &str) -> bool {
    let lower = word.to_lowercase();
    ARTICLES.contains(&lower.as_str())
}

/// Candidate names in order of first appearance, stop-words removed.
pub fn capitalised_phrases(text: &str) -> Vec<String> {
    CAPITALISED_PHRASE
        .find_iter(text)
        .filter_map(|m| {
            let words: Vec<&str> = m.as_str().split_whitespace().collect();
            // "En Cartagena" → "Cartagena", "En La Candelaria" → "La Candelaria".
            let start = words
                .iter()
                .position(|w| !is_stop_word(w) || is_article(w))?;
            let name = words[start..].join(" ");
            (!is_stop_word(&name)).then_some(name)
        })
        .collect()
}

/// Extracts at most `limit` places from capitalised phrases. Never fails.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicExtractor {
    limit: usize,
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_PLACE_LIMIT)
    }
}

impl HeuristicExtractor {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn extract(&self, text: &str) -> Vec<PlaceCandidate> {
        let mut seen = HashSet::new();
        capitalised_phrases(text)
            .into_iter()
            .filter(|name| seen.insert(name.to_lowercase()))
            .take(self.limit)
            .map(PlaceCandidate::named)
            .collect()
    }
}

#[async_trait]
impl PlaceExtractor for HeuristicExtractor {
    async fn extract_places(&self, text: &str) -> EnrichmentOutcome<Vec<PlaceCandidate>> {
        let places = self.extract(text);
        debug!(count = places.len(), limit = self.limit, "heuristic extraction");
        Ok(places)
    }
}
