//! HTTP collaborators: the answering backend and Wikipedia image lookup.

pub mod backend;
mod error;
pub mod images;

pub use backend::{BackendClient, BackendSettings};
pub use error::ClientError;
pub use images::{ImageSettings, WikipediaImages};
