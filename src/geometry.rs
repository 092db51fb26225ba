/// Shared geographic primitives used across state, overlay and service modules.
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

pub type GeoResult<T> = std::result::Result<T, GeoError>;

/// Validated WGS84 coordinate. Construction is the only place range checks happen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct RawGeoPoint {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = GeoError;

    fn try_from(raw: RawGeoPoint) -> GeoResult<Self> {
        Self::new(raw.lat, raw.lng)
    }
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> GeoResult<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    /// For compile-time constants already known to be in range.
    pub(crate) const fn new_unchecked(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub const fn lat(self) -> f64 {
        self.lat
    }

    pub const fn lng(self) -> f64 {
        self.lng
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// A device fix: position plus the reported accuracy radius in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub position: GeoPoint,
    pub accuracy_m: Option<f64>,
}

impl PositionFix {
    pub const fn new(position: GeoPoint, accuracy_m: Option<f64>) -> Self {
        Self {
            position,
            accuracy_m,
        }
    }
}

/// Great-circle distance in meters.
pub fn haversine_m(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let sin_dlat = (delta_lat / 2.0).sin();
    let sin_dlng = (delta_lng / 2.0).sin();
    let a = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng;
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Arithmetic midpoint, good enough for anchoring a label on a short segment.
/// Takes the short way around across the antimeridian.
pub fn midpoint(a: GeoPoint, b: GeoPoint) -> GeoPoint {
    let mut delta_lng = b.lng - a.lng;
    if delta_lng > 180.0 {
        delta_lng -= 360.0;
    } else if delta_lng < -180.0 {
        delta_lng += 360.0;
    }

    let mut lng = a.lng + delta_lng / 2.0;
    if lng > 180.0 {
        lng -= 360.0;
    } else if lng < -180.0 {
        lng += 360.0;
    }
    GeoPoint {
        lat: (a.lat + b.lat) / 2.0,
        lng,
    }
}

/// Sum of consecutive haversine distances, in insertion order.
pub fn path_length_m(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_m(pair[0], pair[1]))
        .sum()
}

pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{meters:.1} m")
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}

/// Routing answer: the primary path plus any alternatives, all origin to destination.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Route {
    pub path: Vec<GeoPoint>,
    pub alternatives: Vec<Vec<GeoPoint>>,
}

impl Route {
    pub fn new(path: Vec<GeoPoint>) -> Self {
        Self {
            path,
            alternatives: Vec::new(),
        }
    }

    pub fn with_alternatives(mut self, alternatives: Vec<Vec<GeoPoint>>) -> Self {
        self.alternatives = alternatives;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    pub const fn rgb(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}
