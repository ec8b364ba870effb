//! Enrichment layer: Gemini text generation, LLM/heuristic normalizers and place extractors.

pub mod extractor;
pub mod generate;
pub mod heuristic;
pub mod normalizer;

pub use extractor::{LlmExtractor, parse_places, strip_code_fences};
pub use generate::{
    GeminiClient, GeminiSettings, GenerateError, GenerateRequest, GenerateResponse, TextGenerator,
};
pub use heuristic::{DEFAULT_PLACE_LIMIT, HeuristicExtractor};
pub use normalizer::{LlmNormalizer, WhitespaceNormalizer, collapse_whitespace};
