//! Map-search deep links for extracted places.
//!
//! Each place becomes a query string of its non-empty fields plus a country
//! qualifier, e.g. `Catedral de Sal, Zipaquirá, Cundinamarca, Colombia`,
//! form-encoded into `<base>?api=1&query=<encoded>`.

use url::form_urlencoded;

use crate::{MapLink, PlaceCandidate};

pub const DEFAULT_MAP_SEARCH_BASE: &str = "https://www.google.com/maps/search/";
pub const DEFAULT_COUNTRY: &str = "Colombia";

/// Where map links point and which country qualifies every query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSettings {
    pub search_base: String,
    pub country: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            search_base: DEFAULT_MAP_SEARCH_BASE.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

/// Build the human-readable search query for a place.
///
/// Blank or missing fields are skipped; the rest are joined with `", "`.
pub fn map_query(place: &PlaceCandidate, country: &str) -> String {
    [
        Some(place.name.as_str()),
        place.city.as_deref(),
        place.department.as_deref(),
        Some(country),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|field| !field.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}

/// Build the map-search link for a place. Pure; never fails.
pub fn build_map_link(place: &PlaceCandidate, settings: &MapSettings) -> MapLink {
    let query = map_query(place, &settings.country);
    let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
    MapLink {
        name: place.name.clone(),
        url: format!("{}?api=1&query={}", settings.search_base, encoded),
    }
}
