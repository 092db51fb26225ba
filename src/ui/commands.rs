use std::sync::mpsc;

use crate::geometry::{GeoPoint, PositionFix};
use crate::overlay::Overlay;
use crate::provider::Place;
use crate::state::SelectedFeature;
use crate::theme::{LineStyle, MarkerCategory, TileLayer};

#[derive(Debug, Clone, PartialEq)]
pub struct PinMarker {
    pub id: String,
    pub position: GeoPoint,
    pub note: String,
    pub icon_url: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SharedMarker {
    pub id: String,
    pub position: GeoPoint,
    pub name: String,
    pub icon_url: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Everything the map renderer can be asked to do. The page controllers and the
/// state machine never touch renderer internals.
#[derive(Debug, Clone, PartialEq)]
pub enum MapCommand {
    SetBaseLayer(TileLayer),
    SetView { center: GeoPoint, zoom: u8 },
    FlyTo(SelectedFeature),
    ShowInstructions(Option<String>),
    DrawOverlay(Overlay),
    DrawHistoryPath { points: Vec<GeoPoint>, style: LineStyle },
    DrawPins(Vec<PinMarker>),
    DrawSharedLocations(Vec<SharedMarker>),
    ShowCurrentPosition {
        fix: PositionFix,
        icon_url: &'static str,
        accuracy_style: LineStyle,
    },
    OpenPinForm {
        position: GeoPoint,
        categories: &'static [MarkerCategory],
    },
    ClosePinForm,
    ShowShareDialog { link: String, embed_html: String },
    /// Place search hits, best first. Empty clears the result list.
    ShowSearchResults(Vec<Place>),
    Notice { level: NoticeLevel, message: String },
}

/// Typed command channel into the renderer.
pub trait MapSink {
    fn submit(&mut self, command: MapCommand);
}

impl MapSink for Vec<MapCommand> {
    fn submit(&mut self, command: MapCommand) {
        self.push(command);
    }
}

impl MapSink for mpsc::Sender<MapCommand> {
    fn submit(&mut self, command: MapCommand) {
        if self.send(command).is_err() {
            tracing::warn!("map renderer disconnected; dropping command");
        }
    }
}
