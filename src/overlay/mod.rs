//! Renderer-agnostic view model derived from the active tracking session.

use crate::geometry::{format_distance, midpoint, GeoPoint, Route};
use crate::state::{ToolMode, TrackingSession};
use crate::theme::{LineStyle, ThemeSpec, TOOL_ICONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconKind {
    MeasurePoint,
    RouteStart,
    RouteEnd,
}

impl IconKind {
    pub const fn url(self) -> &'static str {
        match self {
            Self::MeasurePoint => TOOL_ICONS.measure_point,
            Self::RouteStart => TOOL_ICONS.route_start,
            Self::RouteEnd => TOOL_ICONS.route_end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub position: GeoPoint,
    pub icon: IconKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Segment,
    Total,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub position: GeoPoint,
    pub text: String,
    pub kind: LabelKind,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Overlay {
    pub polyline: Vec<GeoPoint>,
    pub line_style: Option<LineStyle>,
    /// Alternative routes drawn beneath the primary polyline.
    pub alternatives: Vec<Vec<GeoPoint>>,
    pub alternative_style: Option<LineStyle>,
    pub labels: Vec<Label>,
    pub markers: Vec<Marker>,
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.polyline.is_empty()
            && self.alternatives.is_empty()
            && self.labels.is_empty()
            && self.markers.is_empty()
    }

    pub fn segment_labels(&self) -> impl Iterator<Item = &Label> {
        self.labels
            .iter()
            .filter(|label| label.kind == LabelKind::Segment)
    }

    pub fn total_label(&self) -> Option<&Label> {
        self.labels.iter().find(|label| label.kind == LabelKind::Total)
    }
}

/// Pure: the same session and route always yield the same geometry and text,
/// whatever the theme.
pub fn assemble(session: &TrackingSession, route: Option<&Route>, theme: &ThemeSpec) -> Overlay {
    match session.mode() {
        ToolMode::MeasureDistance => measure_overlay(session, theme),
        ToolMode::Directions => directions_overlay(session, route, theme),
        _ => Overlay::default(),
    }
}

fn measure_overlay(session: &TrackingSession, theme: &ThemeSpec) -> Overlay {
    let points = session.points();
    let Some(last) = points.last().copied().filter(|_| points.len() >= 2) else {
        return Overlay::default();
    };

    let mut labels: Vec<Label> = points
        .windows(2)
        .zip(session.segment_distances_m())
        .map(|(pair, meters)| Label {
            position: midpoint(pair[0], pair[1]),
            text: format_distance(meters),
            kind: LabelKind::Segment,
        })
        .collect();
    labels.push(Label {
        position: last,
        text: format!("Total: {}", format_distance(session.total_distance_m())),
        kind: LabelKind::Total,
    });

    Overlay {
        polyline: points.to_vec(),
        line_style: Some(theme.measure_line()),
        labels,
        markers: points
            .iter()
            .map(|&position| Marker {
                position,
                icon: IconKind::MeasurePoint,
            })
            .collect(),
        ..Overlay::default()
    }
}

fn directions_overlay(
    session: &TrackingSession,
    route: Option<&Route>,
    theme: &ThemeSpec,
) -> Overlay {
    let [origin, destination] = session.points() else {
        return Overlay::default();
    };

    let (polyline, alternatives) = route
        .map(|route| (route.path.clone(), route.alternatives.clone()))
        .unwrap_or_default();
    Overlay {
        line_style: (!polyline.is_empty()).then(|| theme.route_line()),
        alternative_style: (!alternatives.is_empty()).then(|| theme.alternative_route_line()),
        polyline,
        alternatives,
        labels: Vec::new(),
        markers: vec![
            Marker {
                position: *origin,
                icon: IconKind::RouteStart,
            },
            Marker {
                position: *destination,
                icon: IconKind::RouteEnd,
            },
        ],
    }
}
