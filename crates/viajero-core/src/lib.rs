pub mod error;
pub mod map_link;
pub mod place;
pub mod service;

pub use error::{EnrichmentOutcome, ServiceError};
pub use map_link::{MapSettings, build_map_link, map_query};
pub use place::{
    APOLOGY_TEXT, BackendReply, ChatRequest, ChatResult, EMPTY_REPLY_TEXT, EXTRACTION_WARNING,
    Location, MapLink, PlaceCandidate,
};
pub use service::{AnswerBackend, ImageResolver, MapLinkBuilder, PlaceExtractor, TextNormalizer};
