//! Collaborator interfaces consumed by the orchestrator.
//!
//! Implementations live in `viajero-client` (HTTP backends) and `viajero-ai`
//! (generative normalizer/extractor); tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::{
    BackendReply, ChatRequest, EnrichmentOutcome, MapLink, MapSettings, PlaceCandidate,
    ServiceError, build_map_link,
};

/// The primary answering service.
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    async fn answer(&self, request: &ChatRequest) -> Result<BackendReply, ServiceError>;
}

/// Rewrites raw answer text into a more readable form.
#[async_trait]
pub trait TextNormalizer: Send + Sync {
    async fn normalize(&self, text: &str) -> EnrichmentOutcome<String>;
}

/// Identifies points of interest mentioned in answer text.
#[async_trait]
pub trait PlaceExtractor: Send + Sync {
    async fn extract_places(&self, text: &str) -> EnrichmentOutcome<Vec<PlaceCandidate>>;
}

/// Looks up a representative image for a place name.
///
/// Infallible by contract: lookup errors degrade to `None`.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    async fn resolve_image(&self, place_name: &str) -> Option<String>;
}

/// Turns a place into a map link. Pure and infallible.
pub trait MapLinkBuilder: Send + Sync {
    fn build_link(&self, place: &PlaceCandidate) -> MapLink;
}

impl MapLinkBuilder for MapSettings {
    fn build_link(&self, place: &PlaceCandidate) -> MapLink {
        build_map_link(place, self)
    }
}
