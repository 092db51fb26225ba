use super::model::ToolMode;
use thiserror::Error;

pub type StateResult<T> = std::result::Result<T, StateError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("{mode:?} holds {points} tracking points but allows at most {max}")]
    TooManyPoints {
        mode: ToolMode,
        points: usize,
        max: usize,
    },
    #[error("route geometry present while {mode:?} holds {points} points")]
    OrphanRoute { mode: ToolMode, points: usize },
}
