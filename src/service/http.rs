use std::sync::{Arc, RwLock};
use std::time::Duration;

use jiff::Timestamp;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::auth::{AuthError, AuthResult, AuthService, Credentials, ProfileUpdate};
use super::error::{ServiceError, ServiceResult};
use super::model::{
    AuthSession, LocationRecord, NewLocation, NewPin, NewSharedLocation, Pin, SharedLocation,
    TimeFilter, User,
};
use super::LocationService;
use crate::geometry::GeoPoint;
use crate::theme::ThemeId;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared HTTP plumbing: base URL, connection pool and the bearer token.
#[derive(Debug)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> ServiceResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| ServiceError::Transport {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self {
            base_url,
            http,
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&self, token: Option<String>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub(crate) fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ServiceResult<T> {
        let url = self.url(path);
        let request = self.authorized(self.http.get(&url).query(query));
        self.send(request, &url)
    }

    pub(crate) fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> ServiceResult<T> {
        let url = self.url(path);
        let request = self.authorized(self.http.post(&url).json(body));
        self.send(request, &url)
    }

    pub(crate) fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> ServiceResult<T> {
        let url = self.url(path);
        let request = self.authorized(self.http.put(&url).json(body));
        self.send(request, &url)
    }

    pub(crate) fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ServiceResult<T> {
        let url = self.url(path);
        let request = self.authorized(self.http.delete(&url).query(query));
        self.send(request, &url)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> ServiceResult<T> {
        tracing::debug!(url, "api request");
        let response = request.send().map_err(|source| ServiceError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .map(|body| body.message)
                .unwrap_or_else(|_| status.to_string());
            tracing::warn!(url, status = status.as_u16(), %message, "api request rejected");
            return Err(match status.as_u16() {
                401 | 403 => ServiceError::Unauthorized,
                404 => ServiceError::NotFound(message),
                code => ServiceError::Status {
                    url: url.to_string(),
                    status: code,
                    message,
                },
            });
        }

        response.json::<T>().map_err(|source| ServiceError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct LocationDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "userId")]
    user_id: String,
    lat: f64,
    lng: f64,
    timestamp: Timestamp,
    #[serde(default)]
    theme: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PinDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "userId")]
    user_id: String,
    lat: f64,
    lng: f64,
    #[serde(default)]
    note: String,
    timestamp: Timestamp,
    #[serde(default)]
    theme: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SharedLocationDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "sharedByUserId", default)]
    shared_by: Option<String>,
    lat: f64,
    lng: f64,
    #[serde(default)]
    name: String,
    timestamp: Timestamp,
    #[serde(default)]
    theme: Option<String>,
}

fn position(lat: f64, lng: f64) -> ServiceResult<GeoPoint> {
    GeoPoint::new(lat, lng).map_err(|err| ServiceError::InvalidPayload(err.to_string()))
}

fn theme(raw: Option<&str>) -> ThemeId {
    raw.map(ThemeId::parse_or_default).unwrap_or_default()
}

impl TryFrom<LocationDoc> for LocationRecord {
    type Error = ServiceError;

    fn try_from(doc: LocationDoc) -> ServiceResult<Self> {
        Ok(Self {
            position: position(doc.lat, doc.lng)?,
            theme: theme(doc.theme.as_deref()),
            id: doc.id,
            user_id: doc.user_id,
            timestamp: doc.timestamp,
        })
    }
}

impl TryFrom<PinDoc> for Pin {
    type Error = ServiceError;

    fn try_from(doc: PinDoc) -> ServiceResult<Self> {
        Ok(Self {
            position: position(doc.lat, doc.lng)?,
            theme: theme(doc.theme.as_deref()),
            id: doc.id,
            owner_id: doc.user_id,
            note: doc.note,
            timestamp: doc.timestamp,
        })
    }
}

impl TryFrom<SharedLocationDoc> for SharedLocation {
    type Error = ServiceError;

    fn try_from(doc: SharedLocationDoc) -> ServiceResult<Self> {
        Ok(Self {
            position: position(doc.lat, doc.lng)?,
            theme: theme(doc.theme.as_deref()),
            id: doc.id,
            user_id: doc.user_id,
            shared_by: doc.shared_by,
            name: doc.name,
            timestamp: doc.timestamp,
        })
    }
}

fn convert_all<D, T>(docs: Vec<D>) -> ServiceResult<Vec<T>>
where
    T: TryFrom<D, Error = ServiceError>,
{
    docs.into_iter().map(T::try_from).collect()
}

/// The backend treats a missing filter as "everything".
fn filter_query(filter: TimeFilter) -> Vec<(&'static str, &'static str)> {
    match filter {
        TimeFilter::All => Vec::new(),
        other => vec![("timeFilter", other.as_query())],
    }
}

/// Extracts `N` from a "N locations deleted" acknowledgement.
fn parse_deleted_count(message: &str) -> ServiceResult<usize> {
    message
        .split_whitespace()
        .next()
        .and_then(|count| count.parse().ok())
        .ok_or_else(|| ServiceError::InvalidPayload(format!("unexpected delete reply: {message}")))
}

#[derive(Debug, Clone)]
pub struct HttpLocationService {
    client: Arc<ApiClient>,
}

impl HttpLocationService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

impl LocationService for HttpLocationService {
    fn record_location(&self, location: NewLocation) -> ServiceResult<LocationRecord> {
        let timestamp = location.timestamp.unwrap_or_else(Timestamp::now);
        let body = json!({
            "userId": location.user_id,
            "lat": location.position.lat(),
            "lng": location.position.lng(),
            "timestamp": timestamp,
            "theme": location.theme,
        });
        let doc: LocationDoc = self.client.post("/location", &body)?;
        doc.try_into()
    }

    fn list_locations(
        &self,
        user_id: &str,
        filter: TimeFilter,
    ) -> ServiceResult<Vec<LocationRecord>> {
        let docs: Vec<LocationDoc> = self
            .client
            .get(&format!("/location/{user_id}"), &filter_query(filter))?;
        convert_all(docs)
    }

    fn delete_locations(&self, user_id: &str, filter: TimeFilter) -> ServiceResult<usize> {
        let reply: MessageBody = self
            .client
            .delete(&format!("/location/{user_id}"), &filter_query(filter))?;
        parse_deleted_count(&reply.message)
    }

    fn create_pin(&self, pin: NewPin) -> ServiceResult<Pin> {
        let body = json!({
            "userId": pin.user_id,
            "lat": pin.position.lat(),
            "lng": pin.position.lng(),
            "note": pin.note,
            "theme": pin.theme,
        });
        let doc: PinDoc = self.client.post("/location/pin", &body)?;
        doc.try_into()
    }

    fn list_pins(&self, user_id: &str) -> ServiceResult<Vec<Pin>> {
        let docs: Vec<PinDoc> = self.client.get(&format!("/location/pin/{user_id}"), &[])?;
        convert_all(docs)
    }

    fn delete_pin(&self, pin_id: &str) -> ServiceResult<()> {
        let _: serde_json::Value = self
            .client
            .delete(&format!("/location/pin/{pin_id}"), &[])?;
        Ok(())
    }

    fn save_shared_location(&self, shared: NewSharedLocation) -> ServiceResult<SharedLocation> {
        let body = json!({
            "userId": shared.user_id,
            "sharedByUserId": shared.shared_by,
            "lat": shared.position.lat(),
            "lng": shared.position.lng(),
            "name": shared.resolved_name(),
            "theme": shared.theme,
        });
        let doc: SharedLocationDoc = self.client.post("/location/shared", &body)?;
        doc.try_into()
    }

    fn list_shared_locations(&self, user_id: &str) -> ServiceResult<Vec<SharedLocation>> {
        let docs: Vec<SharedLocationDoc> = self
            .client
            .get(&format!("/location/shared/{user_id}"), &[])?;
        convert_all(docs)
    }
}

#[derive(Debug, Clone)]
pub struct HttpAuthService {
    client: Arc<ApiClient>,
}

impl HttpAuthService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    fn authenticate(&self, path: &str, body: serde_json::Value) -> AuthResult<AuthSession> {
        let session: AuthSession = self.client.post(path, &body)?;
        self.client.set_token(Some(session.token.clone()));
        Ok(session)
    }
}

impl AuthService for HttpAuthService {
    fn login(&self, credentials: &Credentials) -> AuthResult<AuthSession> {
        let body = json!({
            "username": credentials.username,
            "email": credentials.email,
            "password": credentials.password,
        });
        self.authenticate("/user/login", body)
            .map_err(|err| match err {
                AuthError::Service(ServiceError::NotFound(_)) => {
                    AuthError::NotFound(credentials.username.clone())
                }
                AuthError::Service(ServiceError::Unauthorized) => AuthError::InvalidCredentials,
                other => other,
            })
    }

    fn register(&self, credentials: &Credentials, preferred_theme: ThemeId) -> AuthResult<AuthSession> {
        let body = json!({
            "username": credentials.username,
            "email": credentials.email,
            "password": credentials.password,
            "preferredTheme": preferred_theme,
        });
        self.authenticate("/user/register", body)
            .map_err(|err| match err {
                AuthError::Service(ServiceError::Status { status: 400, .. }) => {
                    AuthError::UserExists(credentials.username.clone())
                }
                other => other,
            })
    }

    fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> AuthResult<User> {
        let body = serde_json::to_value(update).map_err(|err| {
            AuthError::Service(ServiceError::InvalidPayload(err.to_string()))
        })?;
        let user: ProfileDoc = self.client.put(&format!("/user/{user_id}"), &body)?;
        Ok(user.into_user(user_id))
    }
}

#[derive(Debug, Deserialize)]
struct ProfileDoc {
    #[serde(rename = "_id", alias = "id", default)]
    id: Option<String>,
    username: String,
    #[serde(rename = "preferredTheme", default)]
    preferred_theme: Option<String>,
}

impl ProfileDoc {
    fn into_user(self, fallback_id: &str) -> User {
        User {
            id: self.id.unwrap_or_else(|| fallback_id.to_string()),
            username: self.username,
            preferred_theme: theme(self.preferred_theme.as_deref()),
        }
    }
}
