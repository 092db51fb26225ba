use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{app_config_path, config_env_dirs, write_json, WriteJsonError, APP_DIR};
use crate::service::{AuthSession, User};

const SESSION_FILE: &str = "session.json";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("failed to read session: {path}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write session: {path}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to encode session")]
    Encode(#[from] serde_json::Error),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct SessionState {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    remembered_username: Option<String>,
}

/// Authenticated identity persisted across runs. Loaded at startup, saved on change.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    state: SessionState,
}

impl SessionStore {
    /// Empty store that will persist to `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: SessionState::default(),
        }
    }

    pub fn load_default() -> SessionResult<Self> {
        let (xdg_config_home, home) = config_env_dirs();
        let path = app_config_path(APP_DIR, SESSION_FILE, xdg_config_home.as_deref(), home.as_deref())
            .map_err(|_| SessionError::MissingHomeDirectory)?;
        Self::load_from(path)
    }

    /// A corrupt session file is treated as signed out.
    pub fn load_from(path: impl Into<PathBuf>) -> SessionResult<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self::at(path));
        }
        let contents = fs::read_to_string(&path).map_err(|source| SessionError::Read {
            path: path.clone(),
            source,
        })?;
        let state = serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "discarding unreadable session");
            SessionState::default()
        });
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.state.user.as_ref().map(|user| user.id.as_str())
    }

    pub fn remembered_username(&self) -> Option<&str> {
        self.state.remembered_username.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.token.is_some() && self.state.user.is_some()
    }

    pub fn sign_in(&mut self, session: AuthSession) -> SessionResult<()> {
        self.state.token = Some(session.token);
        self.state.user = Some(session.user);
        self.save()
    }

    /// Drops the token and user but keeps the remembered username.
    pub fn sign_out(&mut self) -> SessionResult<()> {
        self.state.token = None;
        self.state.user = None;
        self.save()
    }

    /// In-memory only; persisted by the next `save`.
    pub fn remember(&mut self, username: Option<String>) {
        self.state.remembered_username = username;
    }

    pub fn update_user(&mut self, user: User) -> SessionResult<()> {
        self.state.user = Some(user);
        self.save()
    }

    pub fn save(&self) -> SessionResult<()> {
        write_json(&self.path, &self.state).map_err(|err| match err {
            WriteJsonError::Io(source) => SessionError::Write {
                path: self.path.clone(),
                source,
            },
            WriteJsonError::Serialize(err) => SessionError::Encode(err),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::ThemeId;

    fn session(token: &str) -> AuthSession {
        AuthSession {
            token: token.to_string(),
            user: User {
                id: "66a1".to_string(),
                username: "john".to_string(),
                preferred_theme: ThemeId::Rdr2,
            },
        }
    }

    #[test]
    fn missing_file_starts_signed_out() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = SessionStore::load_from(dir.path().join("session.json")).expect("load");
        assert!(!store.is_authenticated());
        assert!(store.token().is_none());
    }

    #[test]
    fn sign_in_persists_and_sign_out_keeps_remembered_name() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("session.json");
        let mut store = SessionStore::at(&path);
        store.remember(Some("john".to_string()));
        store.sign_in(session("tok-1")).expect("sign in");

        let loaded = SessionStore::load_from(&path).expect("load");
        assert!(loaded.is_authenticated());
        assert_eq!(loaded.token(), Some("tok-1"));
        assert_eq!(loaded.user_id(), Some("66a1"));

        store.sign_out().expect("sign out");
        let loaded = SessionStore::load_from(&path).expect("load");
        assert!(!loaded.is_authenticated());
        assert_eq!(loaded.remembered_username(), Some("john"));
    }

    #[test]
    fn corrupt_session_is_treated_as_signed_out() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("session.json");
        fs::write(&path, "{{{").expect("write");
        let store = SessionStore::load_from(&path).expect("load");
        assert!(!store.is_authenticated());
    }
}
