use crate::config::ConfigError;
use crate::geometry::GeoError;
use crate::input::CommandError;
use crate::provider::{GeocodingError, GeolocationError, RoutingError};
use crate::service::{AuthError, ServiceError};
use crate::state::StateError;
use crate::storage::SessionError;
use crate::theme::ThemeError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not signed in")]
    NotSignedIn,
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Geo(#[from] GeoError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Geolocation(#[from] GeolocationError),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Geocoding(#[from] GeocodingError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Theme(#[from] ThemeError),
    #[error(transparent)]
    Command(#[from] CommandError),
}
