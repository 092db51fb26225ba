use super::Services;
use crate::service::{login_or_register, AuthResult, AuthSession, Credentials};
use crate::storage::{SessionResult, SessionStore};
use crate::theme::ThemeId;

pub struct LoginPage {
    services: Services,
    username: String,
    remember: bool,
}

impl LoginPage {
    /// Prefills the username remembered by a previous sign-in.
    pub fn new(services: Services, store: &SessionStore) -> Self {
        let username = store.remembered_username().unwrap_or_default().to_string();
        Self {
            services,
            remember: !username.is_empty(),
            username,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn remember(&self) -> bool {
        self.remember
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }

    pub fn set_remember(&mut self, remember: bool) {
        self.remember = remember;
    }

    pub fn submit(&self, store: &mut SessionStore, theme: ThemeId) -> AuthResult<AuthSession> {
        let result = login_or_register(
            self.services.auth.as_ref(),
            store,
            &Credentials::username(self.username.as_str()),
            theme,
            self.remember,
        );
        match &result {
            Ok(session) => self.services.set_token(Some(session.token.clone())),
            Err(err) => {
                tracing::warn!(%err, "sign-in failed");
                self.services.notifier.notify(&format!("Login failed: {err}"));
            }
        }
        result
    }

    pub fn sign_out(&self, store: &mut SessionStore) -> SessionResult<()> {
        self.services.set_token(None);
        store.sign_out()?;
        tracing::info!("signed out");
        Ok(())
    }
}
