use thiserror::Error;
use viajero_core::ServiceError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected response shape: {0}")]
    Malformed(&'static str),
}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(e) => ServiceError::Transport(e.to_string()),
            ClientError::Server { status, body } => ServiceError::Server { status, body },
            ClientError::Json(e) => ServiceError::Malformed(e.to_string()),
            ClientError::Malformed(what) => ServiceError::Malformed(what.to_string()),
        }
    }
}
