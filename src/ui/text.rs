use std::io::Write;

use super::commands::{MapCommand, MapSink, NoticeLevel};
use crate::geometry::format_distance;
use crate::state::FeatureKind;

/// Line-oriented renderer for the headless shell.
pub struct TextRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> MapSink for TextRenderer<W> {
    fn submit(&mut self, command: MapCommand) {
        for line in describe(&command) {
            if let Err(err) = writeln!(self.out, "{line}") {
                tracing::warn!(?err, "failed to write map output");
                return;
            }
        }
    }
}

pub fn describe(command: &MapCommand) -> Vec<String> {
    match command {
        MapCommand::SetBaseLayer(tiles) => vec![format!("[tiles] {}", tiles.name)],
        MapCommand::SetView { center, zoom } => vec![format!("[view] {center} @ z{zoom}")],
        MapCommand::FlyTo(feature) => {
            let kind = match feature.kind {
                FeatureKind::CurrentLocation => "current location",
                FeatureKind::SharedLocation => "shared location",
                FeatureKind::Pin => "pin",
                FeatureKind::SearchResult => "search result",
            };
            vec![format!("[fly] {kind} {} @ z{}", feature.position, feature.zoom)]
        }
        MapCommand::ShowInstructions(Some(text)) => vec![format!("[hint] {text}")],
        MapCommand::ShowInstructions(None) => Vec::new(),
        MapCommand::DrawOverlay(overlay) => {
            if overlay.is_empty() {
                return vec!["[overlay] cleared".to_string()];
            }
            let mut lines = vec![format!(
                "[overlay] {} vertices, {} markers",
                overlay.polyline.len(),
                overlay.markers.len()
            )];
            lines.extend(
                overlay
                    .labels
                    .iter()
                    .map(|label| format!("  {} at {}", label.text, label.position)),
            );
            if !overlay.alternatives.is_empty() {
                lines.push(format!("  {} alternative routes", overlay.alternatives.len()));
            }
            lines
        }
        MapCommand::DrawHistoryPath { points, .. } => {
            let length = crate::geometry::path_length_m(points);
            vec![format!(
                "[path] {} points, {}",
                points.len(),
                format_distance(length)
            )]
        }
        MapCommand::DrawPins(pins) => {
            let mut lines = vec![format!("[pins] {}", pins.len())];
            lines.extend(
                pins.iter()
                    .map(|pin| format!("  {} {} {}", pin.id, pin.position, pin.note)),
            );
            lines
        }
        MapCommand::DrawSharedLocations(shared) => {
            vec![format!("[shared] {} saved locations", shared.len())]
        }
        MapCommand::ShowCurrentPosition { fix, .. } => match fix.accuracy_m {
            Some(accuracy) => vec![format!(
                "[you] {} (±{})",
                fix.position,
                format_distance(accuracy)
            )],
            None => vec![format!("[you] {}", fix.position)],
        },
        MapCommand::OpenPinForm { position, .. } => {
            vec![format!("[pin-form] new pin at {position}; `pin <note>` or `cancel`")]
        }
        MapCommand::ClosePinForm => vec!["[pin-form] closed".to_string()],
        MapCommand::ShowShareDialog { link, embed_html } => {
            vec![format!("[share] {link}"), format!("[embed] {embed_html}")]
        }
        MapCommand::ShowSearchResults(places) if places.is_empty() => {
            vec!["[search] no places found".to_string()]
        }
        MapCommand::ShowSearchResults(places) => places
            .iter()
            .enumerate()
            .map(|(index, place)| format!("[search] {}. {} ({})", index + 1, place.name, place.position))
            .collect(),
        MapCommand::Notice { level, message } => match level {
            NoticeLevel::Info => vec![format!("[info] {message}")],
            NoticeLevel::Error => vec![format!("[error] {message}")],
        },
    }
}
