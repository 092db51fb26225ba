use serde::{Deserialize, Serialize};

use crate::geometry::{haversine_m, path_length_m, GeoPoint};

/// The map tool that currently governs how clicks are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolMode {
    #[default]
    None,
    AddLocation,
    MeasureDistance,
    Directions,
    FindMe,
    ShareLocation,
}

impl ToolMode {
    /// Upper bound on tracking points, `None` when unbounded.
    pub const fn max_points(self) -> Option<usize> {
        match self {
            Self::None | Self::FindMe | Self::ShareLocation => Some(0),
            Self::AddLocation => Some(1),
            Self::Directions => Some(2),
            Self::MeasureDistance => None,
        }
    }

    pub const fn consumes_clicks(self) -> bool {
        matches!(
            self,
            Self::AddLocation | Self::MeasureDistance | Self::Directions
        )
    }

    /// One-shot modes that complete from the device position instead of clicks.
    pub const fn needs_position(self) -> bool {
        matches!(self, Self::FindMe | Self::ShareLocation)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::AddLocation => "add-location",
            Self::MeasureDistance => "track-distance",
            Self::Directions => "directions",
            Self::FindMe => "find-me",
            Self::ShareLocation => "share-location",
        }
    }

    /// Guidance text shown over the map while the tool is active.
    pub fn instructions(self, point_count: usize) -> Option<String> {
        match self {
            Self::None => None,
            Self::AddLocation => Some("Click on the map to add a new location".to_string()),
            Self::MeasureDistance => Some(format!(
                "Click multiple points to measure distance ({point_count} points selected)"
            )),
            Self::Directions => Some(
                match point_count {
                    0 => "Click to set starting point",
                    1 => "Click to set destination",
                    _ => "Route calculated. Click to change destination",
                }
                .to_string(),
            ),
            Self::FindMe => Some("Locating you...".to_string()),
            Self::ShareLocation => Some("Finding your location to share...".to_string()),
        }
    }
}

impl std::str::FromStr for ToolMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "add" | "add-location" | "addlocation" => Ok(Self::AddLocation),
            "measure" | "track-distance" | "trackdistance" => Ok(Self::MeasureDistance),
            "directions" | "getdirections" => Ok(Self::Directions),
            "findme" | "find-me" => Ok(Self::FindMe),
            "share" | "share-location" | "sharelocation" => Ok(Self::ShareLocation),
            other => Err(format!("unknown tool mode: {other}")),
        }
    }
}

/// Points accumulated while a multi-click tool is active.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackingSession {
    mode: ToolMode,
    points: Vec<GeoPoint>,
}

impl TrackingSession {
    pub const fn new(mode: ToolMode) -> Self {
        Self {
            mode,
            points: Vec::new(),
        }
    }

    pub const fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distance of each consecutive pair, in insertion order.
    pub fn segment_distances_m(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|pair| haversine_m(pair[0], pair[1]))
            .collect()
    }

    /// Recomputed from scratch on every call.
    pub fn total_distance_m(&self) -> f64 {
        path_length_m(&self.points)
    }

    pub(super) fn push(&mut self, point: GeoPoint) {
        self.points.push(point);
    }

    pub(super) fn replace_last(&mut self, point: GeoPoint) {
        if let Some(last) = self.points.last_mut() {
            *last = point;
        }
    }

    pub(super) fn clear(&mut self) {
        self.points.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    CurrentLocation,
    SharedLocation,
    Pin,
    SearchResult,
}

/// One-shot "fly to and highlight" instruction for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectedFeature {
    pub kind: FeatureKind,
    pub position: GeoPoint,
    pub zoom: u8,
}

pub const CURRENT_LOCATION_ZOOM: u8 = 16;
pub const SHARED_LOCATION_ZOOM: u8 = 15;
pub const PIN_ZOOM: u8 = 15;
pub const SEARCH_RESULT_ZOOM: u8 = 15;

impl SelectedFeature {
    pub const fn new(kind: FeatureKind, position: GeoPoint, zoom: u8) -> Self {
        Self {
            kind,
            position,
            zoom,
        }
    }

    pub const fn current_location(position: GeoPoint) -> Self {
        Self::new(FeatureKind::CurrentLocation, position, CURRENT_LOCATION_ZOOM)
    }

    pub const fn shared_location(position: GeoPoint, zoom: Option<u8>) -> Self {
        let zoom = match zoom {
            Some(zoom) => zoom,
            None => SHARED_LOCATION_ZOOM,
        };
        Self::new(FeatureKind::SharedLocation, position, zoom)
    }

    pub const fn search_result(position: GeoPoint) -> Self {
        Self::new(FeatureKind::SearchResult, position, SEARCH_RESULT_ZOOM)
    }

    pub const fn pin(position: GeoPoint) -> Self {
        Self::new(FeatureKind::Pin, position, PIN_ZOOM)
    }
}
