use std::sync::mpsc;

use reqwest::Url;

use super::worker::spawn_worker_action;
use super::Services;
use crate::config::AppConfig;
use crate::geometry::{GeoPoint, PositionFix, Route};
use crate::overlay::assemble;
use crate::provider::{GeocodingResult, GeolocationError, Place, RoutingError};
use crate::service::{
    LocationRecord, NewLocation, NewPin, NewSharedLocation, Pin, ServiceResult, SharedLocation,
    TimeFilter,
};
use crate::state::{
    Activation, ClickOutcome, MapStateMachine, PositionDelivery, PositionOutcome, PositionRequest,
    RouteDelivery, RouteRequest, SelectedFeature, ToolMode,
};
use crate::theme::{BaseLayer, ThemeId};
use crate::ui::{MapCommand, MapSink, NoticeLevel, PinMarker, SharedMarker};

const INITIAL_ZOOM: u8 = 13;
const SHARE_ZOOM: u8 = 15;

/// Collaborator answers, delivered back to the page through its channel.
#[derive(Debug)]
enum Completion {
    Route {
        generation: u64,
        result: Result<Route, RoutingError>,
    },
    Position {
        generation: u64,
        result: Result<PositionFix, GeolocationError>,
    },
    Tracking(Result<PositionFix, GeolocationError>),
}

pub struct MapPage {
    services: Services,
    machine: MapStateMachine,
    user_id: String,
    theme: ThemeId,
    base_layer: BaseLayer,
    share_base_url: String,
    fallback_position: GeoPoint,
    history: Vec<LocationRecord>,
    pins: Vec<Pin>,
    shared: Vec<SharedLocation>,
    search_results: Vec<Place>,
    pending_pin: Option<GeoPoint>,
    share_target: Option<GeoPoint>,
    tracking_in_flight: bool,
    tx: mpsc::Sender<Completion>,
    rx: mpsc::Receiver<Completion>,
}

impl MapPage {
    pub fn new(services: Services, user_id: impl Into<String>, theme: ThemeId, config: &AppConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            services,
            machine: MapStateMachine::new(),
            user_id: user_id.into(),
            theme,
            base_layer: BaseLayer::default(),
            share_base_url: config.share_base_url.trim_end_matches('/').to_string(),
            fallback_position: config.fallback_position,
            history: Vec::new(),
            pins: Vec::new(),
            shared: Vec::new(),
            search_results: Vec::new(),
            pending_pin: None,
            share_target: None,
            tracking_in_flight: false,
            tx,
            rx,
        }
    }

    pub fn machine(&self) -> &MapStateMachine {
        &self.machine
    }

    pub fn mode(&self) -> ToolMode {
        self.machine.mode()
    }

    pub fn theme(&self) -> ThemeId {
        self.theme
    }

    pub fn history(&self) -> &[LocationRecord] {
        &self.history
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub fn shared_locations(&self) -> &[SharedLocation] {
        &self.shared
    }

    pub fn base_layer(&self) -> BaseLayer {
        self.base_layer
    }

    pub fn search_results(&self) -> &[Place] {
        &self.search_results
    }

    pub fn pending_pin(&self) -> Option<GeoPoint> {
        self.pending_pin
    }

    pub fn share_target(&self) -> Option<GeoPoint> {
        self.share_target
    }

    /// Fetches today's path, pins and saved shared locations, then draws everything.
    pub fn load(&mut self, sink: &mut dyn MapSink) -> ServiceResult<()> {
        let locations = &self.services.locations;
        let result = locations
            .list_locations(&self.user_id, TimeFilter::Today)
            .and_then(|history| Ok((history, locations.list_pins(&self.user_id)?)))
            .and_then(|(history, pins)| {
                Ok((history, pins, locations.list_shared_locations(&self.user_id)?))
            });

        match result {
            Ok((history, pins, shared)) => {
                tracing::info!(
                    user = %self.user_id,
                    path = history.len(),
                    pins = pins.len(),
                    shared = shared.len(),
                    "map data loaded"
                );
                self.history = history;
                self.pins = pins;
                self.shared = shared;
                self.render_all(sink);
                Ok(())
            }
            Err(err) => {
                self.report(sink, &format!("Failed to load map data: {err}"));
                self.render_all(sink);
                Err(err)
            }
        }
    }

    pub fn set_theme(&mut self, theme: ThemeId, sink: &mut dyn MapSink) {
        if self.theme != theme {
            self.theme = theme;
            self.render_all(sink);
        }
    }

    pub fn set_base_layer(&mut self, layer: BaseLayer, sink: &mut dyn MapSink) {
        self.base_layer = layer;
        sink.submit(MapCommand::SetBaseLayer(layer.tiles(self.theme.spec())));
    }

    /// Re-reads the user's pins after they changed elsewhere, e.g. a delete on the pins page.
    pub fn reload_pins(&mut self, sink: &mut dyn MapSink) -> ServiceResult<()> {
        match self.services.locations.list_pins(&self.user_id) {
            Ok(pins) => {
                self.pins = pins;
                self.draw_pins(sink);
                Ok(())
            }
            Err(err) => {
                self.report(sink, &format!("Failed to load pins: {err}"));
                Err(err)
            }
        }
    }

    /// Looks up `query`, lists the hits and flies to the best one.
    pub fn search(&mut self, query: &str, sink: &mut dyn MapSink) -> GeocodingResult<&[Place]> {
        let places = match self.services.geocoder.search(query) {
            Ok(places) => places,
            Err(err) => {
                tracing::warn!(%err, query, "place search failed");
                self.report(sink, &format!("Search failed: {err}"));
                return Err(err);
            }
        };
        tracing::info!(query, found = places.len(), "place search");
        self.search_results = places;
        sink.submit(MapCommand::ShowSearchResults(self.search_results.clone()));
        self.select_search_result(0, sink);
        Ok(&self.search_results)
    }

    /// Flies to the `index`th hit of the last search. False when there is no such hit.
    pub fn select_search_result(&mut self, index: usize, sink: &mut dyn MapSink) -> bool {
        let Some(place) = self.search_results.get(index) else {
            return false;
        };
        self.machine
            .select_feature(SelectedFeature::search_result(place.position));
        self.flush_selected_feature(sink);
        true
    }

    pub fn activate(&mut self, mode: ToolMode, sink: &mut dyn MapSink) {
        if mode != ToolMode::AddLocation {
            self.close_pin_form(sink);
        }
        match self.machine.activate(mode) {
            Activation::Unchanged => return,
            Activation::Ready => {}
            Activation::NeedsPosition(request) => self.request_position(request),
            Activation::Completed(outcome) => self.apply_position_outcome(outcome, sink),
        }
        self.render_tool(sink);
    }

    pub fn click(&mut self, point: GeoPoint, sink: &mut dyn MapSink) {
        match self.machine.handle_map_click(point) {
            ClickOutcome::Forward(point) | ClickOutcome::OpenPinForm(point) => {
                self.open_pin_form(point, sink);
            }
            ClickOutcome::RequestRoute(request) => self.request_route(request),
            ClickOutcome::Measured {
                total_m,
                point_count,
            } => {
                tracing::debug!(total_m, point_count, "measured distance");
            }
            ClickOutcome::OriginSet(_) | ClickOutcome::Ignored => {}
        }
        self.render_tool(sink);
    }

    pub fn reset(&mut self, sink: &mut dyn MapSink) {
        self.machine.reset();
        self.close_pin_form(sink);
        self.share_target = None;
        self.render_tool(sink);
    }

    /// Persists the pending pin. The form stays open on failure.
    pub fn submit_pin(&mut self, note: &str, sink: &mut dyn MapSink) -> ServiceResult<Option<Pin>> {
        let Some(position) = self.pending_pin else {
            tracing::warn!("pin submitted without a pending location");
            return Ok(None);
        };

        let created = self.services.locations.create_pin(NewPin {
            user_id: self.user_id.clone(),
            position,
            note: note.trim().to_string(),
            theme: self.theme,
        });
        match created {
            Ok(pin) => {
                tracing::info!(pin = %pin.id, "pin created");
                self.pins.insert(0, pin.clone());
                self.machine.reset();
                self.close_pin_form(sink);
                self.draw_pins(sink);
                self.render_tool(sink);
                Ok(Some(pin))
            }
            Err(err) => {
                self.report(sink, &format!("Failed to save pin: {err}"));
                Err(err)
            }
        }
    }

    pub fn cancel_pin(&mut self, sink: &mut dyn MapSink) {
        if self.mode() == ToolMode::AddLocation {
            self.machine.reset();
        }
        self.close_pin_form(sink);
        self.render_tool(sink);
    }

    pub fn share_link(&self, position: GeoPoint) -> String {
        format!(
            "{}?lat={}&lng={}&zoom={SHARE_ZOOM}",
            self.share_base_url,
            position.lat(),
            position.lng()
        )
    }

    pub fn embed_html(&self, position: GeoPoint) -> String {
        format!(
            "<iframe \n  src=\"{}\" \n  width=\"600\" \n  height=\"450\" \n  style=\"border:0;\" \n  allowfullscreen=\"\" \n  loading=\"lazy\" \n  referrerpolicy=\"no-referrer-when-downgrade\">\n</iframe>",
            self.share_link(position)
        )
    }

    /// Handles an incoming `?lat=..&lng=..&zoom=..` link. Returns false when the link
    /// carries no usable coordinates.
    pub fn open_shared_link(&mut self, link: &str, sink: &mut dyn MapSink) -> bool {
        let Some((position, zoom)) = parse_shared_link(link) else {
            tracing::warn!(link, "ignoring shared link without valid coordinates");
            return false;
        };
        self.machine
            .select_feature(SelectedFeature::shared_location(position, zoom));
        self.flush_selected_feature(sink);
        self.offer_share(position, sink);
        true
    }

    /// Flies to a feature chosen on another page, e.g. a pin.
    pub fn focus(&mut self, feature: SelectedFeature, sink: &mut dyn MapSink) {
        self.machine.select_feature(feature);
        self.flush_selected_feature(sink);
    }

    pub fn save_shared_location(
        &mut self,
        name: Option<&str>,
        sink: &mut dyn MapSink,
    ) -> ServiceResult<Option<SharedLocation>> {
        let Some(position) = self.share_target else {
            tracing::warn!("nothing to save; no location is being shared");
            return Ok(None);
        };

        let saved = self.services.locations.save_shared_location(NewSharedLocation {
            user_id: self.user_id.clone(),
            shared_by: Some(self.user_id.clone()),
            position,
            name: name.map(str::to_string),
            theme: self.theme,
        });
        match saved {
            Ok(shared) => {
                self.services.notifier.notify("Location saved successfully!");
                sink.submit(MapCommand::Notice {
                    level: NoticeLevel::Info,
                    message: format!("Saved \"{}\"", shared.name),
                });
                self.shared.insert(0, shared.clone());
                self.share_target = None;
                self.draw_shared(sink);
                Ok(Some(shared))
            }
            Err(err) => {
                self.report(sink, "Failed to save location. Please try again.");
                Err(err)
            }
        }
    }

    /// Periodic tracking: asks for the device position; the fix is recorded on delivery.
    pub fn tick_tracking(&mut self) {
        if self.tracking_in_flight {
            tracing::debug!("tracking request still in flight; skipping tick");
            return;
        }
        self.tracking_in_flight = true;
        let geolocation = self.services.geolocation.clone();
        spawn_worker_action(self.services.executor.as_ref(), &self.tx, move || {
            Completion::Tracking(geolocation.current_position())
        });
    }

    /// Drains collaborator completions in arrival order. Returns how many were handled.
    pub fn pump(&mut self, sink: &mut dyn MapSink) -> usize {
        let mut handled = 0;
        while let Ok(completion) = self.rx.try_recv() {
            handled += 1;
            match completion {
                Completion::Route { generation, result } => {
                    self.finish_route(generation, result, sink)
                }
                Completion::Position { generation, result } => {
                    self.finish_position(generation, result, sink)
                }
                Completion::Tracking(result) => self.finish_tracking(result, sink),
            }
        }
        handled
    }

    fn request_route(&self, request: RouteRequest) {
        let router = self.services.router.clone();
        spawn_worker_action(self.services.executor.as_ref(), &self.tx, move || {
            Completion::Route {
                generation: request.generation,
                result: router.compute_route(request.origin, request.destination),
            }
        });
    }

    fn request_position(&self, request: PositionRequest) {
        tracing::debug!(mode = ?request.mode, "requesting device position");
        let geolocation = self.services.geolocation.clone();
        spawn_worker_action(self.services.executor.as_ref(), &self.tx, move || {
            Completion::Position {
                generation: request.generation,
                result: geolocation.current_position(),
            }
        });
    }

    fn finish_route(
        &mut self,
        generation: u64,
        result: Result<Route, RoutingError>,
        sink: &mut dyn MapSink,
    ) {
        let (result, error) = match result {
            Ok(route) => (Ok(route), None),
            Err(err) => (Err(err.severity()), Some(err)),
        };
        match self.machine.deliver_route(generation, result) {
            RouteDelivery::Stale => return,
            RouteDelivery::Applied => {}
            RouteDelivery::Failed { reverted } => {
                if let Some(err) = error {
                    tracing::warn!(%err, reverted, "route computation failed");
                    self.report(sink, &format!("Directions unavailable: {err}"));
                }
            }
        }
        self.render_tool(sink);
    }

    fn finish_position(
        &mut self,
        generation: u64,
        result: Result<PositionFix, GeolocationError>,
        sink: &mut dyn MapSink,
    ) {
        let (result, error) = match result {
            Ok(fix) => (Ok(fix), None),
            Err(err) => (Err(err.severity()), Some(err)),
        };
        match self.machine.deliver_position(generation, result) {
            PositionDelivery::Stale => return,
            PositionDelivery::Resolved(outcome) => {
                if let Some(fix) = self.machine.last_fix() {
                    self.draw_current_position(fix, sink);
                }
                self.apply_position_outcome(outcome, sink);
            }
            PositionDelivery::Failed => {
                if let Some(err) = error {
                    self.report(sink, &format!("Could not get your location: {err}"));
                }
            }
        }
        self.render_tool(sink);
    }

    fn finish_tracking(
        &mut self,
        result: Result<PositionFix, GeolocationError>,
        sink: &mut dyn MapSink,
    ) {
        self.tracking_in_flight = false;
        let fix = match result {
            Ok(fix) => fix,
            Err(err) => {
                tracing::warn!(%err, "tracking position unavailable");
                return;
            }
        };

        self.machine.update_fix(fix);
        self.draw_current_position(fix, sink);

        let recorded = self.services.locations.record_location(NewLocation {
            user_id: self.user_id.clone(),
            position: fix.position,
            timestamp: None,
            theme: self.theme,
        });
        match recorded {
            Ok(record) => {
                self.history.push(record);
                self.draw_history(sink);
            }
            Err(err) => tracing::warn!(%err, "failed to record location"),
        }
    }

    fn apply_position_outcome(&mut self, outcome: PositionOutcome, sink: &mut dyn MapSink) {
        match outcome {
            PositionOutcome::Focus(_) => self.flush_selected_feature(sink),
            PositionOutcome::Share(position) => self.offer_share(position, sink),
        }
    }

    fn offer_share(&mut self, position: GeoPoint, sink: &mut dyn MapSink) {
        self.share_target = Some(position);
        sink.submit(MapCommand::ShowShareDialog {
            link: self.share_link(position),
            embed_html: self.embed_html(position),
        });
    }

    fn flush_selected_feature(&mut self, sink: &mut dyn MapSink) {
        if let Some(feature) = self.machine.take_selected_feature() {
            sink.submit(MapCommand::FlyTo(feature));
        }
    }

    fn open_pin_form(&mut self, position: GeoPoint, sink: &mut dyn MapSink) {
        self.pending_pin = Some(position);
        sink.submit(MapCommand::OpenPinForm {
            position,
            categories: self.theme.spec().categories,
        });
    }

    fn close_pin_form(&mut self, sink: &mut dyn MapSink) {
        if self.pending_pin.take().is_some() {
            sink.submit(MapCommand::ClosePinForm);
        }
    }

    fn report(&self, sink: &mut dyn MapSink, message: &str) {
        self.services.notifier.notify(message);
        sink.submit(MapCommand::Notice {
            level: NoticeLevel::Error,
            message: message.to_string(),
        });
    }

    fn render_tool(&mut self, sink: &mut dyn MapSink) {
        sink.submit(MapCommand::ShowInstructions(self.machine.instructions()));
        sink.submit(MapCommand::DrawOverlay(assemble(
            self.machine.session(),
            self.machine.route(),
            self.theme.spec(),
        )));
    }

    fn render_all(&mut self, sink: &mut dyn MapSink) {
        let center = self
            .machine
            .last_fix()
            .map_or(self.fallback_position, |fix| fix.position);
        sink.submit(MapCommand::SetBaseLayer(self.base_layer.tiles(self.theme.spec())));
        sink.submit(MapCommand::SetView {
            center,
            zoom: INITIAL_ZOOM,
        });
        if let Some(fix) = self.machine.last_fix() {
            self.draw_current_position(fix, sink);
        }
        self.draw_history(sink);
        self.draw_pins(sink);
        self.draw_shared(sink);
        self.render_tool(sink);
    }

    fn draw_current_position(&self, fix: PositionFix, sink: &mut dyn MapSink) {
        let spec = self.theme.spec();
        sink.submit(MapCommand::ShowCurrentPosition {
            fix,
            icon_url: spec.icons.location_marker,
            accuracy_style: spec.accuracy_circle(),
        });
    }

    fn draw_history(&self, sink: &mut dyn MapSink) {
        sink.submit(MapCommand::DrawHistoryPath {
            points: self.history.iter().map(|record| record.position).collect(),
            style: self.theme.spec().path_line(),
        });
    }

    fn draw_pins(&self, sink: &mut dyn MapSink) {
        let icon_url = self.theme.spec().icons.pin;
        sink.submit(MapCommand::DrawPins(
            self.pins
                .iter()
                .map(|pin| PinMarker {
                    id: pin.id.clone(),
                    position: pin.position,
                    note: pin.note.clone(),
                    icon_url,
                })
                .collect(),
        ));
    }

    fn draw_shared(&self, sink: &mut dyn MapSink) {
        let icon_url = self.theme.spec().icons.location_marker;
        sink.submit(MapCommand::DrawSharedLocations(
            self.shared
                .iter()
                .map(|shared| SharedMarker {
                    id: shared.id.clone(),
                    position: shared.position,
                    name: shared.name.clone(),
                    icon_url,
                })
                .collect(),
        ));
    }
}

/// Accepts a full URL or a bare query string.
fn parse_shared_link(link: &str) -> Option<(GeoPoint, Option<u8>)> {
    let link = link.trim();
    let url = Url::parse(link)
        .or_else(|_| Url::parse(&format!("http://localhost/?{}", link.trim_start_matches('?'))))
        .ok()?;

    let (mut lat, mut lng, mut zoom) = (None, None, None);
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "lat" => lat = value.parse::<f64>().ok(),
            "lng" => lng = value.parse::<f64>().ok(),
            "zoom" => zoom = value.parse::<u8>().ok(),
            _ => {}
        }
    }
    let position = GeoPoint::new(lat?, lng?).ok()?;
    Some((position, zoom))
}
