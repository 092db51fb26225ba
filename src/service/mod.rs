//! Clients for the ChronoMap REST backend plus an in-process stand-in.

pub mod auth;
mod error;
pub mod http;
pub mod memory;
mod model;

pub use auth::{login_or_register, AuthError, AuthResult, AuthService, Credentials, ProfileUpdate};
pub use error::{ServiceError, ServiceResult};
pub use http::{ApiClient, HttpAuthService, HttpLocationService};
pub use memory::{MemoryAuthService, MemoryLocationService};
pub use model::{
    AuthSession, LocationRecord, NewLocation, NewPin, NewSharedLocation, Pin, SharedLocation,
    TimeFilter, TimeRange, User, DEFAULT_SHARED_LOCATION_NAME,
};

/// Persistence of locations, pins and shared locations scoped by user.
pub trait LocationService: Send + Sync {
    fn record_location(&self, location: NewLocation) -> ServiceResult<LocationRecord>;

    /// Oldest first, so the result can be drawn as a path.
    fn list_locations(&self, user_id: &str, filter: TimeFilter)
        -> ServiceResult<Vec<LocationRecord>>;

    /// Returns how many records were removed.
    fn delete_locations(&self, user_id: &str, filter: TimeFilter) -> ServiceResult<usize>;

    fn create_pin(&self, pin: NewPin) -> ServiceResult<Pin>;

    /// Newest first.
    fn list_pins(&self, user_id: &str) -> ServiceResult<Vec<Pin>>;

    fn delete_pin(&self, pin_id: &str) -> ServiceResult<()>;

    fn save_shared_location(&self, shared: NewSharedLocation) -> ServiceResult<SharedLocation>;

    /// Newest first.
    fn list_shared_locations(&self, user_id: &str) -> ServiceResult<Vec<SharedLocation>>;
}
