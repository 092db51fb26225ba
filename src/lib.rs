pub mod app;
pub mod config;
pub mod error;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod notification;
pub mod overlay;
pub mod provider;
pub mod service;
pub mod state;
pub mod storage;
pub mod theme;
pub mod ui;
pub use error::{AppError, AppResult};

use crate::app::{App, Services};
use crate::storage::SessionStore;
use crate::theme::ThemeId;
use crate::ui::TextRenderer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Use in-process services instead of the backend.
    pub offline: bool,
}

/// Entrypoint used by higher-level integrations and CLI bindings.
pub fn run(options: RunOptions) -> AppResult<()> {
    logging::init();
    tracing::info!(offline = options.offline, "starting ChronoMap");

    let config = config::load_app_config();
    let theme = theme::load_theme_preference().unwrap_or_else(|err| {
        tracing::warn!(?err, "failed to load theme preference; using default");
        ThemeId::default()
    });
    let services = if options.offline {
        Services::offline(&config)
    } else {
        Services::http(&config)?
    };
    let store = SessionStore::load_default()?;

    let mut app = App::new(config, services, store, theme);
    let mut sink = TextRenderer::new(std::io::stdout());
    app.start(&mut sink)?;

    let events = app::spawn_input(std::io::BufReader::new(std::io::stdin()));
    app::run_shell(&mut app, &events, &mut sink)?;

    tracing::info!("shutdown complete");
    Ok(())
}
