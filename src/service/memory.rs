use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use jiff::{Timestamp, Zoned};

use super::auth::{AuthError, AuthResult, AuthService, Credentials, ProfileUpdate};
use super::error::{ServiceError, ServiceResult};
use super::model::{
    AuthSession, LocationRecord, NewLocation, NewPin, NewSharedLocation, Pin, SharedLocation,
    TimeFilter, User,
};
use super::LocationService;
use crate::theme::ThemeId;

fn next_id(counter: &AtomicU64, prefix: &str) -> String {
    let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
    format!("{prefix}{n:08x}")
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct Documents {
    locations: Vec<LocationRecord>,
    pins: Vec<Pin>,
    shared: Vec<SharedLocation>,
}

/// In-process document store with the backend's query semantics.
#[derive(Debug, Default)]
pub struct MemoryLocationService {
    documents: Mutex<Documents>,
    ids: AtomicU64,
    clock: Option<Zoned>,
}

impl MemoryLocationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins "now" for time filters and default timestamps.
    pub fn with_clock(now: Zoned) -> Self {
        Self {
            clock: Some(now),
            ..Self::default()
        }
    }

    fn now(&self) -> Zoned {
        self.clock.clone().unwrap_or_else(Zoned::now)
    }
}

impl LocationService for MemoryLocationService {
    fn record_location(&self, location: NewLocation) -> ServiceResult<LocationRecord> {
        let record = LocationRecord {
            id: next_id(&self.ids, "loc"),
            user_id: location.user_id,
            position: location.position,
            timestamp: location
                .timestamp
                .unwrap_or_else(|| self.now().timestamp()),
            theme: location.theme,
        };
        lock(&self.documents).locations.push(record.clone());
        Ok(record)
    }

    fn list_locations(
        &self,
        user_id: &str,
        filter: TimeFilter,
    ) -> ServiceResult<Vec<LocationRecord>> {
        let range = filter.range_at(&self.now())?;
        let mut found: Vec<LocationRecord> = lock(&self.documents)
            .locations
            .iter()
            .filter(|record| record.user_id == user_id && range.contains(record.timestamp))
            .cloned()
            .collect();
        found.sort_by_key(|record| record.timestamp);
        Ok(found)
    }

    fn delete_locations(&self, user_id: &str, filter: TimeFilter) -> ServiceResult<usize> {
        let range = filter.range_at(&self.now())?;
        let mut documents = lock(&self.documents);
        let before = documents.locations.len();
        documents
            .locations
            .retain(|record| record.user_id != user_id || !range.contains(record.timestamp));
        Ok(before - documents.locations.len())
    }

    fn create_pin(&self, pin: NewPin) -> ServiceResult<Pin> {
        let pin = Pin {
            id: next_id(&self.ids, "pin"),
            owner_id: pin.user_id,
            position: pin.position,
            note: pin.note,
            timestamp: self.now().timestamp(),
            theme: pin.theme,
        };
        lock(&self.documents).pins.push(pin.clone());
        Ok(pin)
    }

    fn list_pins(&self, user_id: &str) -> ServiceResult<Vec<Pin>> {
        let mut pins: Vec<Pin> = lock(&self.documents)
            .pins
            .iter()
            .filter(|pin| pin.owner_id == user_id)
            .cloned()
            .collect();
        pins.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        Ok(pins)
    }

    fn delete_pin(&self, pin_id: &str) -> ServiceResult<()> {
        let mut documents = lock(&self.documents);
        let before = documents.pins.len();
        documents.pins.retain(|pin| pin.id != pin_id);
        if documents.pins.len() == before {
            return Err(ServiceError::NotFound(format!("pin {pin_id}")));
        }
        Ok(())
    }

    fn save_shared_location(&self, shared: NewSharedLocation) -> ServiceResult<SharedLocation> {
        let name = shared.resolved_name();
        let saved = SharedLocation {
            id: next_id(&self.ids, "shr"),
            user_id: shared.user_id,
            shared_by: shared.shared_by,
            position: shared.position,
            name,
            timestamp: self.now().timestamp(),
            theme: shared.theme,
        };
        lock(&self.documents).shared.push(saved.clone());
        Ok(saved)
    }

    fn list_shared_locations(&self, user_id: &str) -> ServiceResult<Vec<SharedLocation>> {
        let mut shared: Vec<SharedLocation> = lock(&self.documents)
            .shared
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect();
        shared.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        Ok(shared)
    }
}

/// Username-keyed user table issuing opaque tokens.
#[derive(Debug, Default)]
pub struct MemoryAuthService {
    users: Mutex<HashMap<String, User>>,
    ids: AtomicU64,
}

impl MemoryAuthService {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&self, user: User) -> AuthSession {
        AuthSession {
            token: format!("memory-token-{}-{}", user.id, Timestamp::now().as_millisecond()),
            user,
        }
    }
}

impl AuthService for MemoryAuthService {
    fn login(&self, credentials: &Credentials) -> AuthResult<AuthSession> {
        let user = lock(&self.users)
            .get(&credentials.username)
            .cloned()
            .ok_or_else(|| AuthError::NotFound(credentials.username.clone()))?;
        Ok(self.issue(user))
    }

    fn register(
        &self,
        credentials: &Credentials,
        preferred_theme: ThemeId,
    ) -> AuthResult<AuthSession> {
        let mut users = lock(&self.users);
        if users.contains_key(&credentials.username) {
            return Err(AuthError::UserExists(credentials.username.clone()));
        }
        let user = User {
            id: next_id(&self.ids, "usr"),
            username: credentials.username.clone(),
            preferred_theme,
        };
        users.insert(user.username.clone(), user.clone());
        drop(users);
        Ok(self.issue(user))
    }

    fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> AuthResult<User> {
        let mut users = lock(&self.users);
        let key = users
            .iter()
            .find(|(_, user)| user.id == user_id)
            .map(|(key, _)| key.clone())
            .ok_or_else(|| AuthError::Service(ServiceError::NotFound(format!("user {user_id}"))))?;

        if let Some(username) = update.username.as_ref().filter(|name| **name != key) {
            if users.contains_key(username) {
                return Err(AuthError::UserExists(username.clone()));
            }
        }

        let Some(mut user) = users.remove(&key) else {
            return Err(AuthError::Service(ServiceError::NotFound(format!("user {user_id}"))));
        };
        if let Some(username) = &update.username {
            user.username = username.clone();
        }
        if let Some(theme) = update.preferred_theme {
            user.preferred_theme = theme;
        }
        users.insert(user.username.clone(), user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeoPoint;

    fn service() -> MemoryLocationService {
        MemoryLocationService::with_clock(
            "2025-03-12T12:00:00+00:00[UTC]".parse().expect("zoned"),
        )
    }

    fn record_at(service: &MemoryLocationService, user: &str, at: &str) -> LocationRecord {
        service
            .record_location(NewLocation {
                user_id: user.to_string(),
                position: GeoPoint::new(51.5, -0.1).expect("point"),
                timestamp: Some(at.parse().expect("timestamp")),
                theme: ThemeId::Gta5,
            })
            .expect("record")
    }

    #[test]
    fn locations_are_filtered_by_user_and_window_in_path_order() {
        let service = service();
        record_at(&service, "u1", "2025-03-12T09:00:00Z");
        record_at(&service, "u1", "2025-03-12T08:00:00Z");
        record_at(&service, "u1", "2025-03-11T20:00:00Z");
        record_at(&service, "u2", "2025-03-12T10:00:00Z");

        let today = service.list_locations("u1", TimeFilter::Today).expect("list");
        let stamps: Vec<String> = today.iter().map(|r| r.timestamp.to_string()).collect();
        assert_eq!(stamps, vec!["2025-03-12T08:00:00Z", "2025-03-12T09:00:00Z"]);

        assert_eq!(service.list_locations("u1", TimeFilter::Yesterday).expect("list").len(), 1);
        assert_eq!(service.list_locations("u1", TimeFilter::All).expect("list").len(), 3);
    }

    #[test]
    fn delete_reports_count_for_filter_only() {
        let service = service();
        record_at(&service, "u1", "2025-03-12T09:00:00Z");
        record_at(&service, "u1", "2025-03-11T09:00:00Z");
        record_at(&service, "u2", "2025-03-12T09:00:00Z");

        assert_eq!(service.delete_locations("u1", TimeFilter::Today).expect("delete"), 1);
        assert_eq!(service.list_locations("u1", TimeFilter::All).expect("list").len(), 1);
        assert_eq!(service.list_locations("u2", TimeFilter::All).expect("list").len(), 1);
    }

    #[test]
    fn pins_list_newest_first_and_delete_by_id() {
        let service = service();
        let position = GeoPoint::new(1.0, 1.0).expect("point");
        let first = service
            .create_pin(NewPin {
                user_id: "u1".to_string(),
                position,
                note: "camp".to_string(),
                theme: ThemeId::Rdr2,
            })
            .expect("pin");
        let second = service
            .create_pin(NewPin {
                user_id: "u1".to_string(),
                position,
                note: "saloon".to_string(),
                theme: ThemeId::Rdr2,
            })
            .expect("pin");

        let ids: Vec<String> = service
            .list_pins("u1")
            .expect("list")
            .into_iter()
            .map(|pin| pin.id)
            .collect();
        assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);

        service.delete_pin(&first.id).expect("delete");
        assert!(matches!(
            service.delete_pin(&first.id),
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(service.list_pins("u1").expect("list").len(), 1);
    }

    #[test]
    fn register_rejects_duplicate_usernames() {
        let auth = MemoryAuthService::new();
        auth.register(&Credentials::username("sadie"), ThemeId::Rdr2)
            .expect("register");
        assert!(matches!(
            auth.register(&Credentials::username("sadie"), ThemeId::Gta5),
            Err(AuthError::UserExists(_))
        ));
        assert!(matches!(
            auth.login(&Credentials::username("dutch")),
            Err(AuthError::NotFound(_))
        ));
    }

    #[test]
    fn profile_update_changes_theme_and_name() {
        let auth = MemoryAuthService::new();
        let session = auth
            .register(&Credentials::username("john"), ThemeId::Gta5)
            .expect("register");
        let user = auth
            .update_profile(
                &session.user.id,
                &ProfileUpdate {
                    username: Some("jack".to_string()),
                    preferred_theme: Some(ThemeId::Rdr),
                },
            )
            .expect("update");
        assert_eq!(user.username, "jack");
        assert_eq!(user.preferred_theme, ThemeId::Rdr);
        assert!(auth.login(&Credentials::username("jack")).is_ok());
        assert!(auth.login(&Credentials::username("john")).is_err());
    }
}
