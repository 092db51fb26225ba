use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::geometry::{GeoError, GeoPoint, PositionFix};
use crate::state::Severity;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

pub type GeolocationResult<T> = std::result::Result<T, GeolocationError>;

#[derive(Debug, Error)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("timed out waiting for a position")]
    Timeout,
    #[error("position unavailable: {0}")]
    Unavailable(String),
    #[error("geolocation lookup failed")]
    Transport(#[source] reqwest::Error),
    #[error(transparent)]
    InvalidPosition(#[from] GeoError),
}

impl GeolocationError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport(_) | Self::Unavailable(_))
    }

    pub fn severity(&self) -> Severity {
        if self.is_recoverable() {
            Severity::Recoverable
        } else {
            Severity::Unrecoverable
        }
    }
}

pub trait GeolocationProvider: Send + Sync {
    fn current_position(&self) -> GeolocationResult<PositionFix>;
}

/// Coarse position from the public IP, for hosts without a positioning device.
#[derive(Debug, Clone)]
pub struct IpGeolocation {
    url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

// City-level resolution is the best an IP lookup offers.
const IP_ACCURACY_M: f64 = 5_000.0;

impl IpGeolocation {
    pub fn new(url: impl Into<String>) -> GeolocationResult<Self> {
        let http = Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .map_err(GeolocationError::Transport)?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }
}

fn fix_from_response(response: IpApiResponse) -> GeolocationResult<PositionFix> {
    match (response.status.as_str(), response.lat, response.lon) {
        ("success", Some(lat), Some(lon)) => {
            Ok(PositionFix::new(GeoPoint::new(lat, lon)?, Some(IP_ACCURACY_M)))
        }
        _ => Err(GeolocationError::Unavailable(
            response
                .message
                .unwrap_or_else(|| format!("lookup status {}", response.status)),
        )),
    }
}

impl GeolocationProvider for IpGeolocation {
    fn current_position(&self) -> GeolocationResult<PositionFix> {
        let response = self.http.get(&self.url).send().map_err(|err| {
            if err.is_timeout() {
                GeolocationError::Timeout
            } else {
                GeolocationError::Transport(err)
            }
        })?;
        let body: IpApiResponse = response.json().map_err(GeolocationError::Transport)?;
        let fix = fix_from_response(body)?;
        tracing::debug!(position = %fix.position, "resolved position from ip lookup");
        Ok(fix)
    }
}

/// Always answers with the configured fix; `None` behaves like a denied permission.
#[derive(Debug, Default)]
pub struct FixedGeolocation {
    fix: Mutex<Option<PositionFix>>,
}

impl FixedGeolocation {
    pub fn new(fix: PositionFix) -> Self {
        Self {
            fix: Mutex::new(Some(fix)),
        }
    }

    pub fn denied() -> Self {
        Self::default()
    }

    pub fn set(&self, fix: Option<PositionFix>) {
        match self.fix.lock() {
            Ok(mut guard) => *guard = fix,
            Err(poisoned) => *poisoned.into_inner() = fix,
        }
    }
}

impl GeolocationProvider for FixedGeolocation {
    fn current_position(&self) -> GeolocationResult<PositionFix> {
        let fix = match self.fix.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        fix.ok_or(GeolocationError::PermissionDenied)
    }
}
