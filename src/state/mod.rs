pub mod error;
pub mod event;
pub mod machine;
pub mod model;

pub use error::{StateError, StateResult};
pub use event::{
    Activation, ClickOutcome, ModeTransition, PositionDelivery, PositionOutcome, PositionRequest,
    RouteDelivery, RouteRequest, Severity, TransitionCause,
};
pub use machine::MapStateMachine;
pub use model::{FeatureKind, SelectedFeature, ToolMode, TrackingSession};
