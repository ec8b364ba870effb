//! The chat pipeline.
//!
//! ```text
//! primary answer ──► (normalize ∥ extract) ──► merge ──► [places?] ──► image(place 0) + map links
//! ```
//!
//! Only the primary answer is fatal. Normalization and extraction are joined
//! settle-all: each branch runs to completion and its `Result` is merged on
//! its own. No stage is retried.

use std::sync::Arc;

use tracing::{info, warn};
use viajero_core::{
    AnswerBackend, ChatRequest, ChatResult, EMPTY_REPLY_TEXT, EXTRACTION_WARNING, EnrichmentOutcome,
    ImageResolver, Location, MapLink, MapLinkBuilder, MapSettings, PlaceCandidate, PlaceExtractor,
    TextNormalizer,
};

/// Combines the answering backend with the enrichment collaborators.
pub struct Orchestrator {
    backend: Arc<dyn AnswerBackend>,
    normalizer: Arc<dyn TextNormalizer>,
    extractor: Arc<dyn PlaceExtractor>,
    images: Arc<dyn ImageResolver>,
    links: Arc<dyn MapLinkBuilder>,
}

impl Orchestrator {
    /// Build an orchestrator with default map settings.
    pub fn new(
        backend: Arc<dyn AnswerBackend>,
        normalizer: Arc<dyn TextNormalizer>,
        extractor: Arc<dyn PlaceExtractor>,
        images: Arc<dyn ImageResolver>,
    ) -> Self {
        Self {
            backend,
            normalizer,
            extractor,
            images,
            links: Arc::new(MapSettings::default()),
        }
    }

    pub fn with_map_links(mut self, links: Arc<dyn MapLinkBuilder>) -> Self {
        self.links = links;
        self
    }

    /// Answer a prompt and enrich the answer. Never fails.
    pub async fn run_chat(&self, prompt: &str, location: Option<Location>) -> ChatResult {
        let request = ChatRequest::new(prompt, location);
        let reply = match self.backend.answer(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "primary answer failed, returning apology");
                return ChatResult::degraded();
            }
        };

        let raw = if reply.reply.trim().is_empty() {
            warn!("backend returned a blank reply");
            EMPTY_REPLY_TEXT.to_string()
        } else {
            reply.reply
        };
        let (normalized, extracted) = self.enrich(&raw, reply.places).await;
        let (response_text, places) = merge_outcomes(&raw, normalized, extracted);
        let (image_url, map_links) = self.place_stage(&places).await;

        info!(
            places = places.len(),
            has_image = image_url.is_some(),
            "chat result assembled"
        );
        ChatResult::new(response_text, image_url, map_links)
    }

    /// Run normalization and extraction concurrently on the raw answer.
    ///
    /// Places returned inline by the backend short-circuit the extractor.
    async fn enrich(
        &self,
        raw: &str,
        inline_places: Option<Vec<PlaceCandidate>>,
    ) -> (
        EnrichmentOutcome<String>,
        EnrichmentOutcome<Vec<PlaceCandidate>>,
    ) {
        let extraction = async {
            match inline_places {
                Some(places) => {
                    info!(count = places.len(), "using places returned by backend");
                    Ok(places)
                }
                None => self.extractor.extract_places(raw).await,
            }
        };
        futures::join!(self.normalizer.normalize(raw), extraction)
    }

    /// Image for the first place and one link per place; nothing when empty.
    async fn place_stage(&self, places: &[PlaceCandidate]) -> (Option<String>, Vec<MapLink>) {
        let Some(first) = places.first() else {
            return (None, Vec::new());
        };
        let map_links = places.iter().map(|p| self.links.build_link(p)).collect();
        let image_url = self.images.resolve_image(&first.name).await;
        (image_url, map_links)
    }
}

/// Apply the fallback policy to the two enrichment outcomes.
///
/// Normalization failure falls back to the raw text silently. Extraction
/// failure yields no places and appends [`EXTRACTION_WARNING`] to whichever
/// text was chosen.
fn merge_outcomes(
    raw: &str,
    normalized: EnrichmentOutcome<String>,
    extracted: EnrichmentOutcome<Vec<PlaceCandidate>>,
) -> (String, Vec<PlaceCandidate>) {
    let mut text = match normalized {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "normalization failed, using raw answer");
            raw.to_string()
        }
    };

    let places = match extracted {
        Ok(places) => places,
        Err(e) => {
            warn!(error = %e, "place extraction failed");
            text.push_str(EXTRACTION_WARNING);
            Vec::new()
        }
    };

    (text, places)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Barrier;
    use viajero_core::{APOLOGY_TEXT, BackendReply, ServiceError};

    use super::*;

    const RAW: &str = "Te   recomiendo la Catedral de Sal.";
    const NORMALIZED: &str = "Te recomiendo la Catedral de Sal.";

    // ── Fakes ──

    enum Script {
        Reply,
        Blank,
        ReplyWithPlaces(Vec<PlaceCandidate>),
        Fail,
    }

    struct FakeBackend {
        script: Script,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl FakeBackend {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AnswerBackend for FakeBackend {
        async fn answer(
            &self,
            request: &ChatRequest,
        ) -> Result<BackendReply, ServiceError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.script {
                Script::Reply => Ok(BackendReply {
                    reply: RAW.into(),
                    places: None,
                }),
                Script::Blank => Ok(BackendReply {
                    reply: "  ".into(),
                    places: None,
                }),
                Script::ReplyWithPlaces(places) => Ok(BackendReply {
                    reply: RAW.into(),
                    places: Some(places.clone()),
                }),
                Script::Fail => Err(ServiceError::Server {
                    status: 500,
                    body: "down".into(),
                }),
            }
        }
    }

    /// Normalizer that succeeds with [`NORMALIZED`] or fails.
    struct FakeNormalizer {
        succeed: bool,
        barrier: Option<Arc<Barrier>>,
        inputs: Mutex<Vec<String>>,
    }

    impl FakeNormalizer {
        fn new(succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                succeed,
                barrier: None,
                inputs: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextNormalizer for FakeNormalizer {
        async fn normalize(&self, text: &str) -> EnrichmentOutcome<String> {
            self.inputs.lock().unwrap().push(text.to_string());
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            if self.succeed {
                Ok(NORMALIZED.to_string())
            } else {
                Err(ServiceError::Transport("timeout".into()))
            }
        }
    }

    /// Extractor that returns fixed places, or fails when `places` is `None`.
    struct FakeExtractor {
        places: Option<Vec<PlaceCandidate>>,
        barrier: Option<Arc<Barrier>>,
        inputs: Mutex<Vec<String>>,
    }

    impl FakeExtractor {
        fn new(places: Option<Vec<PlaceCandidate>>) -> Arc<Self> {
            Arc::new(Self {
                places,
                barrier: None,
                inputs: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.inputs.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PlaceExtractor for FakeExtractor {
        async fn extract_places(&self, text: &str) -> EnrichmentOutcome<Vec<PlaceCandidate>> {
            self.inputs.lock().unwrap().push(text.to_string());
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            self.places
                .clone()
                .ok_or(ServiceError::MissingConfig("GEMINI_API_KEY"))
        }
    }

    struct FakeImages {
        url: Option<String>,
        lookups: Mutex<Vec<String>>,
    }

    impl FakeImages {
        fn new(url: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                url: url.map(str::to_string),
                lookups: Mutex::new(Vec::new()),
            })
        }

        fn lookups(&self) -> Vec<String> {
            self.lookups.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageResolver for FakeImages {
        async fn resolve_image(&self, place_name: &str) -> Option<String> {
            self.lookups.lock().unwrap().push(place_name.to_string());
            self.url.clone()
        }
    }

    #[derive(Default)]
    struct CountingLinks {
        settings: MapSettings,
        calls: AtomicUsize,
    }

    impl MapLinkBuilder for CountingLinks {
        fn build_link(&self, place: &PlaceCandidate) -> MapLink {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.settings.build_link(place)
        }
    }

    struct Harness {
        backend: Arc<FakeBackend>,
        normalizer: Arc<FakeNormalizer>,
        extractor: Arc<FakeExtractor>,
        images: Arc<FakeImages>,
        links: Arc<CountingLinks>,
    }

    impl Harness {
        fn new(
            backend: Arc<FakeBackend>,
            normalizer: Arc<FakeNormalizer>,
            extractor: Arc<FakeExtractor>,
        ) -> Self {
            Self {
                backend,
                normalizer,
                extractor,
                images: FakeImages::new(Some("https://img.example/first.jpg")),
                links: Arc::new(CountingLinks::default()),
            }
        }

        fn orchestrator(&self) -> Orchestrator {
            Orchestrator::new(
                self.backend.clone(),
                self.normalizer.clone(),
                self.extractor.clone(),
                self.images.clone(),
            )
            .with_map_links(self.links.clone())
        }

        async fn run(&self) -> ChatResult {
            self.orchestrator().run_chat("¿Qué visitar?", None).await
        }

        fn link_calls(&self) -> usize {
            self.links.calls.load(Ordering::SeqCst)
        }
    }

    fn places(names: &[&str]) -> Vec<PlaceCandidate> {
        names.iter().map(|n| PlaceCandidate::named(*n)).collect()
    }

    fn link_names(result: &ChatResult) -> Vec<&str> {
        result.map_links.iter().map(|l| l.name.as_str()).collect()
    }

    // ── Fallback matrix ──

    #[tokio::test]
    async fn primary_failure_degrades_to_apology() {
        let h = Harness::new(
            FakeBackend::new(Script::Fail),
            FakeNormalizer::new(true),
            FakeExtractor::new(Some(places(&["Monserrate"]))),
        );
        let result = h.run().await;

        assert_eq!(result, ChatResult::degraded());
        assert_eq!(result.response_text, APOLOGY_TEXT);
        assert!(result.image_url.is_none());
        assert!(result.map_links.is_empty());
        assert!(result.grounding_chunks.is_empty());
        assert!(h.normalizer.inputs.lock().unwrap().is_empty());
        assert_eq!(h.extractor.calls(), 0);
        assert!(h.images.lookups().is_empty());
        assert_eq!(h.link_calls(), 0);
    }

    #[tokio::test]
    async fn both_succeed() {
        let h = Harness::new(
            FakeBackend::new(Script::Reply),
            FakeNormalizer::new(true),
            FakeExtractor::new(Some(places(&["Catedral de Sal", "Guatavita"]))),
        );
        let result = h.run().await;

        assert_eq!(result.response_text, NORMALIZED);
        assert_eq!(
            result.image_url.as_deref(),
            Some("https://img.example/first.jpg")
        );
        assert_eq!(link_names(&result), vec!["Catedral de Sal", "Guatavita"]);
        assert_eq!(h.images.lookups(), vec!["Catedral de Sal"]);
    }

    #[tokio::test]
    async fn normalization_failure_uses_raw_text_without_warning() {
        let h = Harness::new(
            FakeBackend::new(Script::Reply),
            FakeNormalizer::new(false),
            FakeExtractor::new(Some(places(&["Zipaquirá", "Guatavita", "Suesca"]))),
        );
        let result = h.run().await;

        assert_eq!(result.response_text, RAW);
        assert!(!result.response_text.contains(EXTRACTION_WARNING));
        assert_eq!(result.map_links.len(), 3);
        assert_eq!(h.images.lookups(), vec!["Zipaquirá"]);
        assert_eq!(
            result.image_url.as_deref(),
            Some("https://img.example/first.jpg")
        );
    }

    #[tokio::test]
    async fn extraction_failure_appends_warning_to_normalized_text() {
        let h = Harness::new(
            FakeBackend::new(Script::Reply),
            FakeNormalizer::new(true),
            FakeExtractor::new(None),
        );
        let result = h.run().await;

        assert_eq!(
            result.response_text,
            format!("{NORMALIZED}{EXTRACTION_WARNING}")
        );
        assert!(result.map_links.is_empty());
        assert!(result.image_url.is_none());
        assert!(h.images.lookups().is_empty());
        assert_eq!(h.link_calls(), 0);
    }

    #[tokio::test]
    async fn both_fail_gives_raw_text_with_warning() {
        let h = Harness::new(
            FakeBackend::new(Script::Reply),
            FakeNormalizer::new(false),
            FakeExtractor::new(None),
        );
        let result = h.run().await;

        assert_eq!(result.response_text, format!("{RAW}{EXTRACTION_WARNING}"));
        assert!(result.map_links.is_empty());
        assert!(result.image_url.is_none());
    }

    #[tokio::test]
    async fn blank_reply_is_replaced_before_enrichment() {
        let h = Harness::new(
            FakeBackend::new(Script::Blank),
            FakeNormalizer::new(false),
            FakeExtractor::new(Some(Vec::new())),
        );
        let result = h.run().await;

        assert_eq!(result.response_text, EMPTY_REPLY_TEXT);
        assert_eq!(*h.normalizer.inputs.lock().unwrap(), vec![EMPTY_REPLY_TEXT]);
        assert_eq!(*h.extractor.inputs.lock().unwrap(), vec![EMPTY_REPLY_TEXT]);
        assert!(result.map_links.is_empty());
    }

    // ── Dependent stage ──

    #[tokio::test]
    async fn empty_extraction_skips_image_and_links() {
        let h = Harness::new(
            FakeBackend::new(Script::Reply),
            FakeNormalizer::new(true),
            FakeExtractor::new(Some(Vec::new())),
        );
        let result = h.run().await;

        assert_eq!(result.response_text, NORMALIZED);
        assert!(result.image_url.is_none());
        assert!(result.map_links.is_empty());
        assert!(h.images.lookups().is_empty());
        assert_eq!(h.link_calls(), 0);
    }

    #[tokio::test]
    async fn five_places_one_lookup_five_links_in_order() {
        let names = ["Cartagena", "Mompox", "Santa Marta", "Minca", "Palomino"];
        let h = Harness::new(
            FakeBackend::new(Script::Reply),
            FakeNormalizer::new(true),
            FakeExtractor::new(Some(places(&names))),
        );
        let result = h.run().await;

        assert_eq!(h.images.lookups(), vec!["Cartagena"]);
        assert_eq!(h.link_calls(), 5);
        assert_eq!(link_names(&result), names.to_vec());
    }

    #[tokio::test]
    async fn missing_image_leaves_links_intact() {
        let mut h = Harness::new(
            FakeBackend::new(Script::Reply),
            FakeNormalizer::new(true),
            FakeExtractor::new(Some(places(&["Tatacoa"]))),
        );
        h.images = FakeImages::new(None);
        let result = h.run().await;

        assert!(result.image_url.is_none());
        assert_eq!(result.map_links.len(), 1);
        assert_eq!(h.images.lookups(), vec!["Tatacoa"]);
    }

    #[tokio::test]
    async fn map_link_for_catedral_de_sal() {
        let place = PlaceCandidate::named("Catedral de Sal")
            .with_city("Zipaquirá")
            .with_department("Cundinamarca");
        let h = Harness::new(
            FakeBackend::new(Script::Reply),
            FakeNormalizer::new(true),
            FakeExtractor::new(Some(vec![place.clone()])),
        );
        let result = h.run().await;

        assert_eq!(result.map_links[0], MapSettings::default().build_link(&place));
        assert!(result.map_links[0].url.contains("api=1&query=Catedral+de+Sal%2C+Zipaquir"));
    }

    // ── Inputs and inline places ──

    #[tokio::test]
    async fn enrichers_see_raw_answer_and_backend_sees_prompt() {
        let h = Harness::new(
            FakeBackend::new(Script::Reply),
            FakeNormalizer::new(true),
            FakeExtractor::new(Some(Vec::new())),
        );
        let location = Location {
            latitude: 5.02,
            longitude: -74.0,
        };
        h.orchestrator()
            .run_chat("planes en Zipaquirá", Some(location))
            .await;

        let requests = h.backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].message, "planes en Zipaquirá");
        assert_eq!(requests[0].location, Some(location));
        assert_eq!(h.normalizer.inputs.lock().unwrap().as_slice(), [RAW]);
        assert_eq!(h.extractor.inputs.lock().unwrap().as_slice(), [RAW]);
    }

    #[tokio::test]
    async fn inline_places_bypass_extractor() {
        let h = Harness::new(
            FakeBackend::new(Script::ReplyWithPlaces(places(&["Barichara", "Guane"]))),
            FakeNormalizer::new(true),
            FakeExtractor::new(None),
        );
        let result = h.run().await;

        assert_eq!(h.extractor.calls(), 0);
        assert_eq!(result.response_text, NORMALIZED);
        assert_eq!(link_names(&result), vec!["Barichara", "Guane"]);
        assert_eq!(h.images.lookups(), vec!["Barichara"]);
    }

    #[tokio::test]
    async fn inline_empty_places_skip_dependent_stage() {
        let h = Harness::new(
            FakeBackend::new(Script::ReplyWithPlaces(Vec::new())),
            FakeNormalizer::new(true),
            FakeExtractor::new(None),
        );
        let result = h.run().await;

        assert_eq!(result.response_text, NORMALIZED);
        assert!(result.map_links.is_empty());
        assert_eq!(h.link_calls(), 0);
    }

    // ── Concurrency ──

    #[tokio::test]
    async fn enrichments_run_concurrently_and_settle_independently() {
        // Each branch waits for the other; a sequential join would never finish.
        let barrier = Arc::new(Barrier::new(2));
        let normalizer = Arc::new(FakeNormalizer {
            succeed: false,
            barrier: Some(barrier.clone()),
            inputs: Mutex::new(Vec::new()),
        });
        let extractor = Arc::new(FakeExtractor {
            places: Some(places(&["Villa de Leyva"])),
            barrier: Some(barrier),
            inputs: Mutex::new(Vec::new()),
        });
        let h = Harness::new(FakeBackend::new(Script::Reply), normalizer, extractor);

        let result = tokio::time::timeout(Duration::from_secs(5), h.run())
            .await
            .expect("fan-out must not serialize the branches");

        assert_eq!(result.response_text, RAW);
        assert_eq!(link_names(&result), vec!["Villa de Leyva"]);
    }

    // ── Merge policy ──

    #[test]
    fn merge_prefers_normalized_text() {
        let (text, places) = merge_outcomes("raw", Ok("clean".into()), Ok(Vec::new()));
        assert_eq!(text, "clean");
        assert!(places.is_empty());
    }

    #[test]
    fn merge_warning_is_suffix_of_chosen_text() {
        let (text, places) = merge_outcomes(
            "raw",
            Ok("clean".into()),
            Err(ServiceError::Malformed("not json".into())),
        );
        assert!(text.starts_with("clean"));
        assert!(text.ends_with(EXTRACTION_WARNING));
        assert!(places.is_empty());
    }
}
