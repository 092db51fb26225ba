use std::path::{Path, PathBuf};
use std::time::Duration;

use super::Services;
use crate::config::{config_env_dirs, save_app_config_with, AppConfig, ConfigResult};
use crate::error::{AppError, AppResult};
use crate::service::{ProfileUpdate, User};
use crate::storage::SessionStore;
use crate::theme::{save_theme_preference_with, ThemeId, ThemeResult};

pub struct SettingsPage {
    services: Services,
    config: AppConfig,
    theme: ThemeId,
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
}

impl SettingsPage {
    pub fn new(services: Services, config: AppConfig, theme: ThemeId) -> Self {
        let (xdg_config_home, home) = config_env_dirs();
        Self {
            services,
            config,
            theme,
            xdg_config_home,
            home,
        }
    }

    /// Persists under `xdg_config_home` instead of the environment's directories.
    pub fn with_config_home(mut self, xdg_config_home: impl Into<PathBuf>) -> Self {
        self.xdg_config_home = Some(xdg_config_home.into());
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn theme(&self) -> ThemeId {
        self.theme
    }

    pub fn set_theme(&mut self, theme: ThemeId) -> ThemeResult<()> {
        save_theme_preference_with(theme, self.xdg_config_home(), self.home())?;
        tracing::info!(from = %self.theme, to = %theme, "theme changed");
        self.theme = theme;
        Ok(())
    }

    /// Returns the interval actually stored after clamping.
    pub fn set_tracking_interval(&mut self, secs: u64) -> ConfigResult<Duration> {
        self.config.set_tracking_interval_secs(secs);
        save_app_config_with(&self.config, self.xdg_config_home(), self.home())?;
        tracing::info!(secs = self.config.tracking_interval_secs, "tracking interval saved");
        Ok(self.config.tracking_interval())
    }

    /// Sends the username and current theme to the backend and refreshes the session.
    pub fn save_profile(&self, store: &mut SessionStore, username: Option<&str>) -> AppResult<User> {
        let Some(user_id) = store.user_id().map(str::to_string) else {
            return Err(AppError::NotSignedIn);
        };
        let update = ProfileUpdate {
            username: username
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            preferred_theme: Some(self.theme),
        };

        let user = match self.services.auth.update_profile(&user_id, &update) {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(%err, "failed to save settings");
                self.services.notifier.notify("Failed to save settings");
                return Err(err.into());
            }
        };
        store.update_user(user.clone())?;
        self.services.notifier.notify("Settings saved successfully");
        Ok(user)
    }

    fn xdg_config_home(&self) -> Option<&Path> {
        self.xdg_config_home.as_deref()
    }

    fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }
}
