//! Device position, routing and place search collaborators consumed by the map page.

mod geocoding;
mod geolocation;
mod routing;

pub use geocoding::{
    FixedGeocoder, Geocoder, GeocodingError, GeocodingResult, NominatimGeocoder, Place, MAX_PLACES,
};
pub use geolocation::{
    FixedGeolocation, GeolocationError, GeolocationProvider, GeolocationResult, IpGeolocation,
};
pub use routing::{OsrmRouter, RoutingError, RoutingProvider, RoutingResult, StraightLineRouter};
