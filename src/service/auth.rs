use serde::Serialize;
use thiserror::Error;

use super::error::ServiceError;
use super::model::{AuthSession, User};
use crate::storage::{SessionError, SessionStore};
use crate::theme::ThemeId;

pub type AuthResult<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user {0} not found")]
    NotFound(String),
    #[error("user {0} already exists")]
    UserExists(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("username is required")]
    MissingUsername,
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AuthError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Service(err) => err.is_recoverable(),
            _ => false,
        }
    }
}

/// The backend identifies users by name; email and password are optional extras.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    pub username: String,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn username(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "preferredTheme", skip_serializing_if = "Option::is_none")]
    pub preferred_theme: Option<ThemeId>,
}

pub trait AuthService: Send + Sync {
    /// Fails with [`AuthError::NotFound`] when the user has never registered.
    fn login(&self, credentials: &Credentials) -> AuthResult<AuthSession>;
    fn register(&self, credentials: &Credentials, preferred_theme: ThemeId)
        -> AuthResult<AuthSession>;
    fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> AuthResult<User>;
}

/// Logs in, registering the user on first use, and stores the session.
pub fn login_or_register(
    auth: &dyn AuthService,
    store: &mut SessionStore,
    credentials: &Credentials,
    theme: ThemeId,
    remember: bool,
) -> AuthResult<AuthSession> {
    let username = credentials.username.trim();
    if username.is_empty() {
        return Err(AuthError::MissingUsername);
    }
    let credentials = Credentials {
        username: username.to_string(),
        ..credentials.clone()
    };

    let session = match auth.login(&credentials) {
        Ok(session) => session,
        Err(AuthError::NotFound(_)) => {
            tracing::info!(username = %credentials.username, "user not found; registering");
            auth.register(&credentials, theme)?
        }
        Err(err) => return Err(err),
    };

    store.remember(remember.then(|| credentials.username.clone()));
    store.sign_in(session.clone())?;
    tracing::info!(user = %session.user.username, "signed in");
    Ok(session)
}
