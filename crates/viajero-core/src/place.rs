//! Shared chat types exchanged between the backend, the enrichers and callers.

use serde::{Deserialize, Serialize};

/// Fixed reply used when the answering backend cannot be reached or returns garbage.
pub const APOLOGY_TEXT: &str = "Lo siento, ocurrió un error procesando la solicitud.";

/// Stands in for a blank `reply` from the answering backend.
pub const EMPTY_REPLY_TEXT: &str = "Respuesta no válida del servidor.";

/// Appended to the response text when place extraction fails.
pub const EXTRACTION_WARNING: &str = "\n\n(No fue posible generar imágenes ni enlaces de mapa \
para esta respuesta: revisa la configuración del servicio de extracción.)";

/// A geographic position supplied by the user's device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Body sent to the answering backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, location: Option<Location>) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// Reply from the answering backend.
///
/// Some deployments extract places server-side and return them inline, in
/// which case `places` is populated and no second extraction call is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendReply {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub places: Option<Vec<PlaceCandidate>>,
}

/// A named point of interest with optional city/region attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Department (Colombian first-level division) or region.
    #[serde(default, alias = "region", skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl PlaceCandidate {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            city: None,
            department: None,
        }
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }
}

/// A navigable map-search link for one place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapLink {
    pub name: String,
    pub url: String,
}

/// The enriched answer handed back to the caller.
///
/// Degraded results have the same shape as successful ones; only the content
/// differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResult {
    pub response_text: String,
    pub image_url: Option<String>,
    pub map_links: Vec<MapLink>,
    /// Reserved for source attribution. Always empty.
    pub grounding_chunks: Vec<serde_json::Value>,
}

impl ChatResult {
    pub fn new(response_text: String, image_url: Option<String>, map_links: Vec<MapLink>) -> Self {
        Self {
            response_text,
            image_url,
            map_links,
            grounding_chunks: Vec::new(),
        }
    }

    /// The result returned when the primary answer could not be obtained.
    pub fn degraded() -> Self {
        Self::new(APOLOGY_TEXT.to_string(), None, Vec::new())
    }
}
