use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::geometry::PositionFix;
use crate::input::{PinsCommand, ShellCommand, TimelineCommand, HELP};
use crate::notification::{DesktopNotifier, Notifier, RecordingNotifier};
use crate::provider::{
    FixedGeocoder, FixedGeolocation, Geocoder, GeolocationProvider, IpGeolocation,
    NominatimGeocoder, OsrmRouter, RoutingProvider, StraightLineRouter,
};
use crate::service::{
    ApiClient, AuthService, HttpAuthService, HttpLocationService, LocationService,
    MemoryAuthService, MemoryLocationService,
};
use crate::storage::SessionStore;
use crate::theme::ThemeId;
use crate::ui::{MapCommand, MapSink, NoticeLevel};

mod login_page;
mod map_page;
mod pins_page;
mod settings_page;
mod shell;
mod timeline_page;
mod worker;

pub use login_page::LoginPage;
pub use map_page::MapPage;
pub use pins_page::PinsPage;
pub use settings_page::SettingsPage;
pub use shell::{run_shell, spawn_input, ShellEvent};
pub use timeline_page::{TimelinePage, TimelineRow};
pub use worker::{Executor, InlineExecutor, ThreadExecutor};

/// Accuracy reported by the offline position source.
const OFFLINE_ACCURACY_M: f64 = 25.0;

/// Collaborators shared by every page.
#[derive(Clone)]
pub struct Services {
    pub locations: Arc<dyn LocationService>,
    pub auth: Arc<dyn AuthService>,
    pub geolocation: Arc<dyn GeolocationProvider>,
    pub router: Arc<dyn RoutingProvider>,
    pub geocoder: Arc<dyn Geocoder>,
    pub executor: Arc<dyn Executor>,
    pub notifier: Arc<dyn Notifier>,
    api: Option<Arc<ApiClient>>,
}

impl Services {
    /// Backend over HTTP with IP geolocation, OSRM routing and Nominatim search.
    pub fn http(config: &AppConfig) -> AppResult<Self> {
        let api = Arc::new(ApiClient::new(config.api_base_url.as_str())?);
        Ok(Self {
            locations: Arc::new(HttpLocationService::new(api.clone())),
            auth: Arc::new(HttpAuthService::new(api.clone())),
            geolocation: Arc::new(IpGeolocation::new(config.geolocation_url.as_str())?),
            router: Arc::new(OsrmRouter::new(config.routing_url.as_str())?),
            geocoder: Arc::new(NominatimGeocoder::new(config.geocoding_url.as_str())?),
            executor: Arc::new(ThreadExecutor),
            notifier: Arc::new(DesktopNotifier),
            api: Some(api),
        })
    }

    /// Everything in process; positions come from the configured fallback.
    pub fn offline(config: &AppConfig) -> Self {
        Self {
            geolocation: Arc::new(FixedGeolocation::new(PositionFix::new(
                config.fallback_position,
                Some(OFFLINE_ACCURACY_M),
            ))),
            ..Self::in_memory(Arc::new(MemoryLocationService::new()))
        }
    }

    /// In-process services over `locations` with inline delivery.
    pub fn in_memory(locations: Arc<dyn LocationService>) -> Self {
        Self {
            locations,
            auth: Arc::new(MemoryAuthService::new()),
            geolocation: Arc::new(FixedGeolocation::denied()),
            router: Arc::new(StraightLineRouter::new()),
            geocoder: Arc::new(FixedGeocoder::default()),
            executor: Arc::new(InlineExecutor),
            notifier: Arc::new(RecordingNotifier::new()),
            api: None,
        }
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Some(api) = &self.api {
            api.set_token(token);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

struct SignedIn {
    map: MapPage,
    timeline: TimelinePage,
    pins: PinsPage,
}

/// Routes shell commands to the page controllers.
pub struct App {
    services: Services,
    store: SessionStore,
    settings: SettingsPage,
    pages: Option<SignedIn>,
}

impl App {
    pub fn new(config: AppConfig, services: Services, store: SessionStore, theme: ThemeId) -> Self {
        let settings = SettingsPage::new(services.clone(), config, theme);
        Self {
            services,
            store,
            settings,
            pages: None,
        }
    }

    /// Replaces the settings page, e.g. to persist somewhere other than the user's config dir.
    pub fn with_settings(mut self, settings: SettingsPage) -> Self {
        self.settings = settings;
        self
    }

    pub fn theme(&self) -> ThemeId {
        self.settings.theme()
    }

    pub fn session(&self) -> &SessionStore {
        &self.store
    }

    pub fn map(&self) -> Option<&MapPage> {
        self.pages.as_ref().map(|pages| &pages.map)
    }

    pub fn tracking_interval(&self) -> Duration {
        self.settings.config().tracking_interval()
    }

    pub fn is_signed_in(&self) -> bool {
        self.pages.is_some()
    }

    /// Restores a saved session, if any, and loads the map.
    pub fn start(&mut self, sink: &mut dyn MapSink) -> AppResult<()> {
        if self.store.is_authenticated() {
            self.services
                .set_token(self.store.token().map(str::to_string));
            self.open_pages(sink)?;
        } else {
            notice(sink, NoticeLevel::Info, "Sign in with: login <username>");
        }
        Ok(())
    }

    /// Drains collaborator completions into `sink`.
    pub fn pump(&mut self, sink: &mut dyn MapSink) -> usize {
        self.pages
            .as_mut()
            .map_or(0, |pages| pages.map.pump(sink))
    }

    pub fn tick_tracking(&mut self) {
        if let Some(pages) = self.pages.as_mut() {
            pages.map.tick_tracking();
        }
    }

    pub fn dispatch(&mut self, command: ShellCommand, sink: &mut dyn MapSink) -> AppResult<Flow> {
        tracing::debug!(?command, "dispatch");
        match command {
            ShellCommand::Help => {
                for line in HELP.lines() {
                    notice(sink, NoticeLevel::Info, line);
                }
                return Ok(Flow::Continue);
            }
            ShellCommand::Quit => return Ok(Flow::Quit),
            ShellCommand::Login(username) => {
                self.login(username, sink)?;
                return Ok(Flow::Continue);
            }
            ShellCommand::Theme(theme) => {
                self.change_theme(theme, sink)?;
                return Ok(Flow::Continue);
            }
            ShellCommand::Interval(secs) => {
                let interval = self.settings.set_tracking_interval(secs)?;
                notice(
                    sink,
                    NoticeLevel::Info,
                    &format!("Tracking every {}s", interval.as_secs()),
                );
                return Ok(Flow::Continue);
            }
            _ => {}
        }

        let Some(pages) = self.pages.as_mut() else {
            return Err(AppError::NotSignedIn);
        };
        match command {
            ShellCommand::Tool(mode) => pages.map.activate(mode, sink),
            ShellCommand::Click(point) => pages.map.click(point, sink),
            ShellCommand::Reset => pages.map.reset(sink),
            ShellCommand::Layer(layer) => pages.map.set_base_layer(layer, sink),
            ShellCommand::Search(query) => {
                pages.map.search(&query, sink)?;
            }
            ShellCommand::Goto(index) => {
                let found = index
                    .checked_sub(1)
                    .is_some_and(|index| pages.map.select_search_result(index, sink));
                if !found {
                    notice(sink, NoticeLevel::Error, &format!("No search result {index}"));
                }
            }
            ShellCommand::Pin(note) => {
                pages.map.submit_pin(&note, sink)?;
            }
            ShellCommand::Cancel => pages.map.cancel_pin(sink),
            ShellCommand::Share(name) => {
                pages.map.save_shared_location(name.as_deref(), sink)?;
            }
            ShellCommand::OpenLink(link) => {
                if !pages.map.open_shared_link(&link, sink) {
                    notice(sink, NoticeLevel::Error, "Link has no valid coordinates");
                }
            }
            ShellCommand::Track => pages.map.tick_tracking(),
            ShellCommand::Timeline(TimelineCommand::Show(filter)) => {
                match filter {
                    Some(filter) => pages.timeline.set_filter(filter)?,
                    None => pages.timeline.refresh()?,
                }
                show_timeline(&pages.timeline, sink);
            }
            ShellCommand::Timeline(TimelineCommand::Clear) => {
                let deleted = pages.timeline.clear_history()?;
                notice(
                    sink,
                    NoticeLevel::Info,
                    &format!("{deleted} locations deleted"),
                );
            }
            ShellCommand::Pins(PinsCommand::List) => {
                pages.pins.refresh()?;
                show_pins(&pages.pins, sink);
            }
            ShellCommand::Pins(PinsCommand::Delete(id)) => {
                pages.pins.delete(&id)?;
                pages.map.reload_pins(sink)?;
                show_pins(&pages.pins, sink);
            }
            ShellCommand::Pins(PinsCommand::View(id)) => {
                // Pins may have been added on the map since the last listing.
                if pages.pins.view_on_map(&id).is_none() {
                    pages.pins.refresh()?;
                }
                match pages.pins.view_on_map(&id) {
                    Some(feature) => pages.map.focus(feature, sink),
                    None => notice(sink, NoticeLevel::Error, &format!("No pin {id}")),
                }
            }
            ShellCommand::Logout => {
                LoginPage::new(self.services.clone(), &self.store).sign_out(&mut self.store)?;
                self.pages = None;
                notice(sink, NoticeLevel::Info, "Signed out");
            }
            ShellCommand::Status => {
                let line = format!(
                    "mode={} theme={} points={}",
                    pages.map.mode().as_str(),
                    self.settings.theme(),
                    pages.map.machine().points().len()
                );
                notice(sink, NoticeLevel::Info, &line);
            }
            ShellCommand::Help
            | ShellCommand::Quit
            | ShellCommand::Login(_)
            | ShellCommand::Theme(_)
            | ShellCommand::Interval(_) => {}
        }
        Ok(Flow::Continue)
    }

    fn login(&mut self, username: String, sink: &mut dyn MapSink) -> AppResult<()> {
        let mut page = LoginPage::new(self.services.clone(), &self.store);
        page.set_username(username);
        page.set_remember(true);
        let session = page.submit(&mut self.store, self.settings.theme())?;

        // The account's stored theme wins over the local one.
        let theme = session.user.preferred_theme;
        if theme != self.settings.theme() {
            self.settings.set_theme(theme)?;
        }
        notice(
            sink,
            NoticeLevel::Info,
            &format!("Signed in as {}", session.user.username),
        );
        self.open_pages(sink)
    }

    fn change_theme(&mut self, theme: ThemeId, sink: &mut dyn MapSink) -> AppResult<()> {
        self.settings.set_theme(theme)?;
        if let Some(pages) = self.pages.as_mut() {
            pages.map.set_theme(theme, sink);
            if self.store.is_authenticated() {
                if let Err(err) = self.settings.save_profile(&mut self.store, None) {
                    tracing::warn!(%err, "theme saved locally only");
                }
            }
        }
        notice(sink, NoticeLevel::Info, &format!("Theme: {}", theme.spec().name));
        Ok(())
    }

    fn open_pages(&mut self, sink: &mut dyn MapSink) -> AppResult<()> {
        let Some(user_id) = self.store.user_id().map(str::to_string) else {
            return Err(AppError::NotSignedIn);
        };
        let mut map = MapPage::new(
            self.services.clone(),
            user_id.as_str(),
            self.settings.theme(),
            self.settings.config(),
        );
        if let Err(err) = map.load(sink) {
            tracing::warn!(%err, "map opened without persisted data");
        }
        self.pages = Some(SignedIn {
            map,
            timeline: TimelinePage::new(self.services.clone(), user_id.as_str()),
            pins: PinsPage::new(self.services.clone(), user_id),
        });
        Ok(())
    }
}

fn notice(sink: &mut dyn MapSink, level: NoticeLevel, message: &str) {
    sink.submit(MapCommand::Notice {
        level,
        message: message.to_string(),
    });
}

fn show_timeline(page: &TimelinePage, sink: &mut dyn MapSink) {
    if page.is_empty() {
        notice(sink, NoticeLevel::Info, "No location data available");
        return;
    }
    notice(
        sink,
        NoticeLevel::Info,
        &format!("{} ({} locations)", page.filter().label(), page.locations().len()),
    );
    for row in page.rows() {
        let line = format!("{}  {}, {}  {}", row.time, row.latitude, row.longitude, row.theme);
        notice(sink, NoticeLevel::Info, &line);
    }
}

fn show_pins(page: &PinsPage, sink: &mut dyn MapSink) {
    if page.pins().is_empty() {
        notice(sink, NoticeLevel::Info, "No pins yet");
        return;
    }
    for pin in page.pins() {
        let line = format!(
            "{}  {:.6}, {:.6}  {}",
            pin.id,
            pin.position.lat(),
            pin.position.lng(),
            pin.note
        );
        notice(sink, NoticeLevel::Info, &line);
    }
}
