use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::geometry::{GeoError, GeoPoint};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("chronomap/", env!("CARGO_PKG_VERSION"));

/// Upper bound on places returned for one query.
pub const MAX_PLACES: usize = 5;

pub type GeocodingResult<T> = std::result::Result<T, GeocodingError>;

#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("place search failed")]
    Transport(#[source] reqwest::Error),
    #[error("malformed coordinate in search result: {0}")]
    InvalidCoordinate(String),
    #[error(transparent)]
    InvalidPosition(#[from] GeoError),
}

/// One named search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub position: GeoPoint,
}

impl Place {
    pub fn new(name: impl Into<String>, position: GeoPoint) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

pub trait Geocoder: Send + Sync {
    /// At most `MAX_PLACES` matches, best first. An empty list means nothing matched.
    fn search(&self, query: &str) -> GeocodingResult<Vec<Place>>;
}

/// Client for a Nominatim `search` endpoint, e.g. `https://nominatim.openstreetmap.org/search`.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: String,
    // Nominatim encodes coordinates as strings
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(url: impl Into<String>) -> GeocodingResult<Self> {
        let http = Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(GeocodingError::Transport)?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }
}

fn places_from_response(response: Vec<NominatimPlace>) -> GeocodingResult<Vec<Place>> {
    response
        .into_iter()
        .take(MAX_PLACES)
        .map(|place| {
            let lat = parse_coordinate(&place.lat)?;
            let lng = parse_coordinate(&place.lon)?;
            Ok(Place::new(place.display_name, GeoPoint::new(lat, lng)?))
        })
        .collect()
}

fn parse_coordinate(value: &str) -> GeocodingResult<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| GeocodingError::InvalidCoordinate(value.to_string()))
}

impl Geocoder for NominatimGeocoder {
    fn search(&self, query: &str) -> GeocodingResult<Vec<Place>> {
        let limit = MAX_PLACES.to_string();
        let response: Vec<NominatimPlace> = self
            .http
            .get(&self.url)
            .query(&[("format", "json"), ("q", query), ("limit", limit.as_str())])
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .map_err(GeocodingError::Transport)?;
        let places = places_from_response(response)?;
        tracing::debug!(query, found = places.len(), "place search finished");
        Ok(places)
    }
}

/// Case-insensitive substring match over a fixed gazetteer. Offline fallback and test double.
#[derive(Debug, Clone, Default)]
pub struct FixedGeocoder {
    places: Vec<Place>,
}

impl FixedGeocoder {
    pub fn new(places: Vec<Place>) -> Self {
        Self { places }
    }
}

impl Geocoder for FixedGeocoder {
    fn search(&self, query: &str) -> GeocodingResult<Vec<Place>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .places
            .iter()
            .filter(|place| place.name.to_lowercase().contains(&needle))
            .take(MAX_PLACES)
            .cloned()
            .collect())
    }
}
