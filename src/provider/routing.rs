use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::geometry::{GeoPoint, Route};
use crate::state::Severity;

const ROUTE_TIMEOUT: Duration = Duration::from_secs(20);

pub type RoutingResult<T> = std::result::Result<T, RoutingError>;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("no route found")]
    NoRouteFound,
    #[error("routing request failed")]
    Network(#[source] reqwest::Error),
    #[error("routing service answered {code}: {message}")]
    Rejected { code: String, message: String },
    #[error("malformed route geometry: {0}")]
    InvalidGeometry(String),
}

impl RoutingError {
    /// Recoverable failures keep the directions session so another destination can be tried.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoRouteFound | Self::Network(_))
    }

    pub fn severity(&self) -> Severity {
        if self.is_recoverable() {
            Severity::Recoverable
        } else {
            Severity::Unrecoverable
        }
    }
}

pub trait RoutingProvider: Send + Sync {
    fn compute_route(&self, origin: GeoPoint, destination: GeoPoint) -> RoutingResult<Route>;
}

/// Client for an OSRM `route` service, e.g. `https://router.project-osrm.org/route/v1/driving`.
#[derive(Debug, Clone)]
pub struct OsrmRouter {
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

impl OsrmRouter {
    pub fn new(base_url: impl Into<String>) -> RoutingResult<Self> {
        let http = Client::builder()
            .timeout(ROUTE_TIMEOUT)
            .build()
            .map_err(RoutingError::Network)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn route_url(&self, origin: GeoPoint, destination: GeoPoint) -> String {
        // OSRM takes lng,lat pairs
        format!(
            "{}/{},{};{},{}",
            self.base_url,
            origin.lng(),
            origin.lat(),
            destination.lng(),
            destination.lat()
        )
    }
}

fn path_from_geometry(geometry: OsrmGeometry) -> RoutingResult<Vec<GeoPoint>> {
    geometry
        .coordinates
        .into_iter()
        .map(|[lng, lat]| {
            GeoPoint::new(lat, lng).map_err(|err| RoutingError::InvalidGeometry(err.to_string()))
        })
        .collect()
}

/// First route is the recommended one; OSRM lists alternatives after it.
fn route_from_response(response: OsrmResponse) -> RoutingResult<Route> {
    match response.code.as_str() {
        "Ok" => {}
        "NoRoute" | "NoSegment" => return Err(RoutingError::NoRouteFound),
        _ => {
            return Err(RoutingError::Rejected {
                message: response.message.unwrap_or_default(),
                code: response.code,
            })
        }
    }

    let mut routes = response.routes.into_iter();
    let primary = routes.next().ok_or(RoutingError::NoRouteFound)?;
    let path = path_from_geometry(primary.geometry)?;
    let alternatives = routes
        .map(|route| path_from_geometry(route.geometry))
        .collect::<RoutingResult<Vec<_>>>()?;
    Ok(Route::new(path).with_alternatives(alternatives))
}

impl RoutingProvider for OsrmRouter {
    fn compute_route(&self, origin: GeoPoint, destination: GeoPoint) -> RoutingResult<Route> {
        let url = self.route_url(origin, destination);
        tracing::debug!(%url, "requesting route");
        let response: OsrmResponse = self
            .http
            .get(&url)
            .query(&[
                ("overview", "full"),
                ("geometries", "geojson"),
                ("alternatives", "true"),
            ])
            .send()
            .and_then(|response| response.json())
            .map_err(RoutingError::Network)?;
        route_from_response(response)
    }
}

/// Connects origin and destination directly. Offline fallback and test double.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLineRouter {
    unreachable: bool,
}

impl StraightLineRouter {
    pub const fn new() -> Self {
        Self { unreachable: false }
    }

    pub const fn unreachable() -> Self {
        Self { unreachable: true }
    }
}

impl RoutingProvider for StraightLineRouter {
    fn compute_route(&self, origin: GeoPoint, destination: GeoPoint) -> RoutingResult<Route> {
        if self.unreachable {
            return Err(RoutingError::NoRouteFound);
        }
        Ok(Route::new(vec![origin, destination]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).expect("valid test coordinate")
    }

    #[test]
    fn osrm_geometry_is_flipped_to_lat_lng() {
        let response: OsrmResponse = serde_json::from_str(
            r#"{"code":"Ok","routes":[{"geometry":{"type":"LineString",
                "coordinates":[[13.388,52.517],[13.397,52.529]]},"distance":1886.3}]}"#,
        )
        .expect("response");
        let route = route_from_response(response).expect("route");
        assert_eq!(route.path, vec![point(52.517, 13.388), point(52.529, 13.397)]);
        assert!(route.alternatives.is_empty());
    }

    #[test]
    fn osrm_alternatives_follow_the_primary_route() {
        let response: OsrmResponse = serde_json::from_str(
            r#"{"code":"Ok","routes":[
                {"geometry":{"coordinates":[[13.388,52.517],[13.397,52.529]]}},
                {"geometry":{"coordinates":[[13.388,52.517],[13.41,52.52],[13.397,52.529]]}}]}"#,
        )
        .expect("response");
        let route = route_from_response(response).expect("route");
        assert_eq!(route.path.len(), 2);
        assert_eq!(
            route.alternatives,
            vec![vec![point(52.517, 13.388), point(52.52, 13.41), point(52.529, 13.397)]]
        );
    }

    #[test]
    fn malformed_alternative_rejects_the_answer() {
        let response: OsrmResponse = serde_json::from_str(
            r#"{"code":"Ok","routes":[
                {"geometry":{"coordinates":[[13.388,52.517]]}},
                {"geometry":{"coordinates":[[13.388,95.0]]}}]}"#,
        )
        .expect("response");
        let err = route_from_response(response).unwrap_err();
        assert!(matches!(err, RoutingError::InvalidGeometry(_)));
    }

    #[test]
    fn osrm_no_route_is_recoverable() {
        let response: OsrmResponse =
            serde_json::from_str(r#"{"code":"NoRoute","message":"Impossible route"}"#)
                .expect("response");
        let err = route_from_response(response).unwrap_err();
        assert!(matches!(err, RoutingError::NoRouteFound));
        assert_eq!(err.severity(), Severity::Recoverable);
    }

    #[test]
    fn osrm_rejection_is_unrecoverable() {
        let response: OsrmResponse =
            serde_json::from_str(r#"{"code":"InvalidUrl","message":"URL string malformed"}"#)
                .expect("response");
        let err = route_from_response(response).unwrap_err();
        assert_eq!(err.severity(), Severity::Unrecoverable);
    }

    #[test]
    fn route_url_orders_longitude_first() {
        let router = OsrmRouter::new("https://router.example.com/route/v1/driving/")
            .expect("router");
        assert_eq!(
            router.route_url(point(52.5, 13.4), point(52.6, 13.5)),
            "https://router.example.com/route/v1/driving/13.4,52.5;13.5,52.6"
        );
    }

    #[test]
    fn straight_line_router_connects_endpoints() {
        let (a, b) = (point(0.0, 0.0), point(1.0, 1.0));
        assert_eq!(
            StraightLineRouter::new().compute_route(a, b).expect("route"),
            Route::new(vec![a, b])
        );
        assert!(StraightLineRouter::unreachable().compute_route(a, b).is_err());
    }
}
