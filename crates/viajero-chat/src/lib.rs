//! Chat orchestration: one primary answer, settle-all enrichment, image and map-link stage.

mod orchestrator;

pub use orchestrator::Orchestrator;
