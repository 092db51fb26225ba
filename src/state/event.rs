use super::model::{SelectedFeature, ToolMode};
use crate::geometry::GeoPoint;

/// Asks the routing collaborator for a route; the answer must echo `generation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    pub generation: u64,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
}

/// Asks the geolocation collaborator for the device position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRequest {
    pub generation: u64,
    pub mode: ToolMode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionOutcome {
    Focus(SelectedFeature),
    Share(GeoPoint),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    Unchanged,
    Ready,
    NeedsPosition(PositionRequest),
    Completed(PositionOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickOutcome {
    /// No tool active; the page controller's default handler decides.
    Forward(GeoPoint),
    OpenPinForm(GeoPoint),
    Measured { total_m: f64, point_count: usize },
    OriginSet(GeoPoint),
    RequestRoute(RouteRequest),
    Ignored,
}

/// How bad a collaborator failure is for the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Recoverable,
    Unrecoverable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDelivery {
    Applied,
    Stale,
    Failed { reverted: bool },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionDelivery {
    Resolved(PositionOutcome),
    Stale,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    Activate,
    Reset,
    Completed,
    CollaboratorFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub from: ToolMode,
    pub to: ToolMode,
    pub cause: TransitionCause,
    pub generation: u64,
}

impl ModeTransition {
    pub const fn new(from: ToolMode, to: ToolMode, cause: TransitionCause, generation: u64) -> Self {
        Self {
            from,
            to,
            cause,
            generation,
        }
    }
}
