use thiserror::Error;

/// Failure reported by an external collaborator (backend, generator, lookup).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),
}

/// Outcome of one independent enrichment stage.
pub type EnrichmentOutcome<T> = Result<T, ServiceError>;
