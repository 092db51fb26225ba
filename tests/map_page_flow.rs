use std::sync::Arc;

use chronomap::app::{App, MapPage, Services};
use chronomap::config::AppConfig;
use chronomap::geometry::{GeoPoint, PositionFix, Route};
use chronomap::input::parse_command;
use chronomap::notification::RecordingNotifier;
use chronomap::provider::{
    FixedGeocoder, FixedGeolocation, Place, RoutingProvider, RoutingResult, StraightLineRouter,
};
use chronomap::service::{LocationService, MemoryLocationService, NewLocation, TimeFilter};
use chronomap::state::{FeatureKind, ToolMode};
use chronomap::storage::SessionStore;
use chronomap::theme::{BaseLayer, ThemeId, SATELLITE_TILES};
use chronomap::ui::{MapCommand, NoticeLevel};

fn point(lat: f64, lng: f64) -> GeoPoint {
    GeoPoint::new(lat, lng).expect("valid test coordinate")
}

struct Fixture {
    store: Arc<MemoryLocationService>,
    geolocation: Arc<FixedGeolocation>,
    notifier: Arc<RecordingNotifier>,
    services: Services,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryLocationService::new());
    let geolocation = Arc::new(FixedGeolocation::new(PositionFix::new(
        point(40.7128, -74.006),
        Some(12.0),
    )));
    let notifier = Arc::new(RecordingNotifier::new());
    let mut services = Services::in_memory(store.clone());
    services.geolocation = geolocation.clone();
    services.notifier = notifier.clone();
    Fixture {
        store,
        geolocation,
        notifier,
        services,
    }
}

fn page(fixture: &Fixture) -> MapPage {
    MapPage::new(
        fixture.services.clone(),
        "user-1",
        ThemeId::Gta5,
        &AppConfig::default(),
    )
}

fn overlays(commands: &[MapCommand]) -> Vec<&chronomap::overlay::Overlay> {
    commands
        .iter()
        .filter_map(|command| match command {
            MapCommand::DrawOverlay(overlay) => Some(overlay),
            _ => None,
        })
        .collect()
}

#[test]
fn load_draws_base_layer_view_and_layers() {
    let fixture = fixture();
    let mut map = page(&fixture);
    let mut sink = Vec::new();
    map.load(&mut sink).expect("load");

    assert!(matches!(sink[0], MapCommand::SetBaseLayer(_)));
    assert!(matches!(
        sink[1],
        MapCommand::SetView { zoom: 13, .. }
    ));
    assert!(sink
        .iter()
        .any(|command| matches!(command, MapCommand::DrawPins(pins) if pins.is_empty())));
}

#[test]
fn measuring_then_resetting_clears_the_overlay() {
    let fixture = fixture();
    let mut map = page(&fixture);
    let mut sink = Vec::new();

    map.activate(ToolMode::MeasureDistance, &mut sink);
    map.click(point(0.0, 0.0), &mut sink);
    map.click(point(0.0, 1.0), &mut sink);
    map.click(point(1.0, 1.0), &mut sink);

    let last = overlays(&sink).pop().expect("overlay").clone();
    assert_eq!(last.polyline.len(), 3);
    assert_eq!(last.segment_labels().count(), 2);
    assert!(last
        .total_label()
        .is_some_and(|label| label.text.starts_with("Total: ")));

    sink.clear();
    map.reset(&mut sink);
    assert_eq!(map.mode(), ToolMode::None);
    assert!(overlays(&sink).iter().all(|overlay| overlay.is_empty()));
    assert!(sink.contains(&MapCommand::ShowInstructions(None)));
}

#[test]
fn directions_route_is_drawn_once_delivered() {
    let fixture = fixture();
    let mut map = page(&fixture);
    let mut sink = Vec::new();

    map.activate(ToolMode::Directions, &mut sink);
    map.click(point(40.0, -74.0), &mut sink);
    map.click(point(40.1, -74.1), &mut sink);
    assert_eq!(map.pump(&mut sink), 1);

    let overlay = overlays(&sink).pop().expect("overlay").clone();
    assert_eq!(overlay.polyline.first(), Some(&point(40.0, -74.0)));
    assert_eq!(overlay.polyline.last(), Some(&point(40.1, -74.1)));
    assert_eq!(overlay.markers.len(), 2);
    assert!(overlay.alternatives.is_empty());
}

/// Answers every request with the direct line plus one detour through `via`.
struct DetourRouter {
    via: GeoPoint,
}

impl RoutingProvider for DetourRouter {
    fn compute_route(&self, origin: GeoPoint, destination: GeoPoint) -> RoutingResult<Route> {
        Ok(Route::new(vec![origin, destination])
            .with_alternatives(vec![vec![origin, self.via, destination]]))
    }
}

#[test]
fn alternative_routes_are_drawn_with_the_alternative_style() {
    let mut fixture = fixture();
    fixture.services.router = Arc::new(DetourRouter {
        via: point(40.2, -74.0),
    });
    let mut map = page(&fixture);
    let mut sink = Vec::new();

    map.activate(ToolMode::Directions, &mut sink);
    map.click(point(40.0, -74.0), &mut sink);
    map.click(point(40.1, -74.1), &mut sink);
    map.pump(&mut sink);

    let overlay = overlays(&sink).pop().expect("overlay").clone();
    assert_eq!(overlay.polyline, vec![point(40.0, -74.0), point(40.1, -74.1)]);
    assert_eq!(
        overlay.alternatives,
        vec![vec![point(40.0, -74.0), point(40.2, -74.0), point(40.1, -74.1)]]
    );
    assert_eq!(
        overlay.alternative_style,
        Some(ThemeId::Gta5.spec().alternative_route_line())
    );
}

#[test]
fn chosen_base_layer_survives_a_theme_change() {
    let fixture = fixture();
    let mut map = page(&fixture);
    let mut sink = Vec::new();

    map.set_base_layer(BaseLayer::Satellite, &mut sink);
    assert_eq!(sink, vec![MapCommand::SetBaseLayer(SATELLITE_TILES)]);

    sink.clear();
    map.set_theme(ThemeId::Rdr, &mut sink);
    assert_eq!(sink[0], MapCommand::SetBaseLayer(SATELLITE_TILES));

    sink.clear();
    map.set_base_layer(BaseLayer::Theme, &mut sink);
    assert_eq!(sink, vec![MapCommand::SetBaseLayer(ThemeId::Rdr.spec().tiles)]);
}

#[test]
fn search_lists_places_and_flies_to_the_best_match() {
    let mut fixture = fixture();
    fixture.services.geocoder = Arc::new(FixedGeocoder::new(vec![
        Place::new("Saint Denis, Lemoyne", point(29.95, -90.07)),
        Place::new("Saint-Denis, Seine-Saint-Denis", point(48.936, 2.357)),
        Place::new("Valentine, New Hanover", point(42.87, -100.55)),
    ]));
    let mut map = page(&fixture);
    let mut sink = Vec::new();

    let found = map.search("saint", &mut sink).expect("search").len();
    assert_eq!(found, 2);
    assert!(matches!(&sink[0], MapCommand::ShowSearchResults(places) if places.len() == 2));
    assert_eq!(
        sink[1],
        MapCommand::FlyTo(chronomap::state::SelectedFeature::search_result(point(29.95, -90.07)))
    );

    sink.clear();
    assert!(map.select_search_result(1, &mut sink));
    assert!(matches!(
        sink.as_slice(),
        [MapCommand::FlyTo(feature)]
            if feature.kind == FeatureKind::SearchResult && feature.position == point(48.936, 2.357)
    ));
    assert!(!map.select_search_result(2, &mut sink));

    sink.clear();
    assert!(map.search("Blackwater", &mut sink).expect("search").is_empty());
    assert_eq!(sink, vec![MapCommand::ShowSearchResults(Vec::new())]);
}

#[test]
fn stale_route_after_reset_is_ignored() {
    let fixture = fixture();
    let mut map = page(&fixture);
    let mut sink = Vec::new();

    map.activate(ToolMode::Directions, &mut sink);
    map.click(point(40.0, -74.0), &mut sink);
    map.click(point(40.1, -74.1), &mut sink);
    map.reset(&mut sink);
    sink.clear();

    assert_eq!(map.pump(&mut sink), 1);
    assert!(sink.is_empty());
    assert_eq!(map.mode(), ToolMode::None);
    assert!(map.machine().route().is_none());
}

#[test]
fn unreachable_destination_keeps_the_directions_session() {
    let mut fixture = fixture();
    fixture.services.router = Arc::new(StraightLineRouter::unreachable());
    let mut map = page(&fixture);
    let mut sink = Vec::new();

    map.activate(ToolMode::Directions, &mut sink);
    map.click(point(40.0, -74.0), &mut sink);
    map.click(point(40.1, -74.1), &mut sink);
    map.pump(&mut sink);

    assert_eq!(map.mode(), ToolMode::Directions);
    assert_eq!(map.machine().points().len(), 2);
    assert!(map.machine().route().is_none());
    assert_eq!(fixture.notifier.messages().len(), 1);
}

#[test]
fn find_me_flies_to_the_device_position() {
    let fixture = fixture();
    let mut map = page(&fixture);
    let mut sink = Vec::new();

    map.activate(ToolMode::FindMe, &mut sink);
    map.pump(&mut sink);

    let feature = sink
        .iter()
        .find_map(|command| match command {
            MapCommand::FlyTo(feature) => Some(*feature),
            _ => None,
        })
        .expect("fly to");
    assert_eq!(feature.kind, FeatureKind::CurrentLocation);
    assert_eq!(feature.position, point(40.7128, -74.006));
    assert_eq!(feature.zoom, 16);
    assert_eq!(map.mode(), ToolMode::None);
}

#[test]
fn denied_position_reverts_share_mode_and_notifies() {
    let fixture = fixture();
    fixture.geolocation.set(None);
    let mut map = page(&fixture);
    let mut sink = Vec::new();

    map.activate(ToolMode::ShareLocation, &mut sink);
    map.pump(&mut sink);

    assert_eq!(map.mode(), ToolMode::None);
    assert!(map.share_target().is_none());
    assert!(sink.iter().any(|command| matches!(
        command,
        MapCommand::Notice {
            level: NoticeLevel::Error,
            ..
        }
    )));
}

#[test]
fn share_location_offers_link_and_saves_with_default_name() {
    let fixture = fixture();
    let mut map = page(&fixture);
    let mut sink = Vec::new();

    map.activate(ToolMode::ShareLocation, &mut sink);
    map.pump(&mut sink);

    let (link, embed) = sink
        .iter()
        .find_map(|command| match command {
            MapCommand::ShowShareDialog { link, embed_html } => Some((link.clone(), embed_html.clone())),
            _ => None,
        })
        .expect("share dialog");
    assert_eq!(link, "http://localhost:5173?lat=40.7128&lng=-74.006&zoom=15");
    assert!(embed.starts_with("<iframe \n  src=\"http://localhost:5173?lat=40.7128"));
    assert!(embed.ends_with("</iframe>"));

    let saved = map
        .save_shared_location(None, &mut sink)
        .expect("save")
        .expect("share target");
    assert_eq!(saved.name, "Shared Location");
    assert_eq!(saved.shared_by.as_deref(), Some("user-1"));
    assert_eq!(map.shared_locations().len(), 1);
    assert_eq!(
        fixture.notifier.messages(),
        vec!["Location saved successfully!".to_string()]
    );
}

#[test]
fn shared_link_intake_selects_the_location() {
    let fixture = fixture();
    let mut map = page(&fixture);
    let mut sink = Vec::new();

    assert!(map.open_shared_link("http://localhost:5173/?lat=48.8584&lng=2.2945", &mut sink));
    assert_eq!(
        sink.first(),
        Some(&MapCommand::FlyTo(chronomap::state::SelectedFeature::shared_location(
            point(48.8584, 2.2945),
            None
        )))
    );
    assert_eq!(map.share_target(), Some(point(48.8584, 2.2945)));
    assert!(!map.open_shared_link("http://localhost:5173/?zoom=3", &mut sink));
}

#[test]
fn clicking_with_no_tool_opens_the_pin_form_and_submit_persists() {
    let fixture = fixture();
    let mut map = page(&fixture);
    let mut sink = Vec::new();

    map.click(point(34.0522, -118.2437), &mut sink);
    assert_eq!(map.pending_pin(), Some(point(34.0522, -118.2437)));
    assert!(sink
        .iter()
        .any(|command| matches!(command, MapCommand::OpenPinForm { .. })));

    let pin = map
        .submit_pin("  Pillbox Hill  ", &mut sink)
        .expect("submit")
        .expect("pending pin");
    assert_eq!(pin.note, "Pillbox Hill");
    assert!(map.pending_pin().is_none());
    assert!(sink.contains(&MapCommand::ClosePinForm));
    assert_eq!(fixture.store.list_pins("user-1").expect("pins").len(), 1);
}

#[test]
fn tracking_tick_records_the_fix_into_history() {
    let fixture = fixture();
    let mut map = page(&fixture);
    let mut sink = Vec::new();

    map.tick_tracking();
    map.pump(&mut sink);
    map.tick_tracking();
    map.pump(&mut sink);

    assert_eq!(map.history().len(), 2);
    assert_eq!(map.machine().last_fix().map(|fix| fix.accuracy_m), Some(Some(12.0)));
    assert_eq!(
        fixture
            .store
            .list_locations("user-1", TimeFilter::Today)
            .expect("list")
            .len(),
        2
    );

    // A known fix lets find-me complete without waiting.
    sink.clear();
    map.activate(ToolMode::FindMe, &mut sink);
    assert!(sink
        .iter()
        .any(|command| matches!(command, MapCommand::FlyTo(_))));
    assert_eq!(map.pump(&mut sink), 0);
}

#[test]
fn shell_commands_drive_the_app_end_to_end() {
    let dir = tempfile::tempdir().expect("temp dir");
    let fixture = fixture();
    let store = SessionStore::at(dir.path().join("session.json"));
    let settings = chronomap::app::SettingsPage::new(
        fixture.services.clone(),
        AppConfig::default(),
        ThemeId::Rdr2,
    )
    .with_config_home(dir.path());
    let mut app = App::new(AppConfig::default(), fixture.services.clone(), store, ThemeId::Rdr2)
        .with_settings(settings);
    let mut sink = Vec::new();

    app.start(&mut sink).expect("start");
    assert!(!app.is_signed_in());
    assert!(app
        .dispatch(parse_command("tool measure").expect("parse"), &mut sink)
        .is_err());

    for line in ["login arthur", "tool measure", "click 0 0", "click 0 1"] {
        app.dispatch(parse_command(line).expect("parse"), &mut sink)
            .expect("dispatch");
    }
    let map = app.map().expect("map page");
    assert_eq!(map.mode(), ToolMode::MeasureDistance);
    assert_eq!(map.machine().points().len(), 2);
    assert_eq!(app.session().user().map(|user| user.username.as_str()), Some("arthur"));

    app.dispatch(parse_command("theme cyberpunk").expect("parse"), &mut sink)
        .expect("theme");
    assert_eq!(app.theme(), ThemeId::Cyberpunk2077);
    assert_eq!(
        app.session().user().map(|user| user.preferred_theme),
        Some(ThemeId::Cyberpunk2077)
    );

    let flow = app
        .dispatch(parse_command("quit").expect("parse"), &mut sink)
        .expect("quit");
    assert_eq!(flow, chronomap::app::Flow::Quit);
}

fn signed_in_app(fixture: &Fixture, dir: &std::path::Path) -> App {
    let store = SessionStore::at(dir.join("session.json"));
    let settings = chronomap::app::SettingsPage::new(
        fixture.services.clone(),
        AppConfig::default(),
        ThemeId::Gta5,
    )
    .with_config_home(dir);
    let mut app = App::new(AppConfig::default(), fixture.services.clone(), store, ThemeId::Gta5)
        .with_settings(settings);
    let mut sink = Vec::new();
    app.start(&mut sink).expect("start");
    run(&mut app, &["login sadie"], &mut sink);
    app
}

fn run(app: &mut App, lines: &[&str], sink: &mut Vec<MapCommand>) {
    for line in lines {
        app.dispatch(parse_command(line).expect("parse"), sink)
            .expect("dispatch");
    }
}

fn notices(commands: &[MapCommand]) -> Vec<&str> {
    commands
        .iter()
        .filter_map(|command| match command {
            MapCommand::Notice { message, .. } => Some(message.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn pins_page_and_map_agree_after_create_and_delete() {
    let dir = tempfile::tempdir().expect("temp dir");
    let fixture = fixture();
    let mut app = signed_in_app(&fixture, dir.path());
    let user_id = app.session().user_id().expect("user").to_string();
    let mut sink = Vec::new();

    run(&mut app, &["click 1 1", "pin first", "pins", "click 2 2", "pin second"], &mut sink);
    let stored = fixture.store.list_pins(&user_id).expect("pins");
    let (second, first) = (stored[0].id.clone(), stored[1].id.clone());

    // The pins page listed only the first pin; the second must still be found.
    sink.clear();
    run(&mut app, &[format!("pins view {second}").as_str()], &mut sink);
    assert!(sink.contains(&MapCommand::FlyTo(
        chronomap::state::SelectedFeature::pin(point(2.0, 2.0))
    )));
    assert!(notices(&sink).iter().all(|message| !message.starts_with("No pin")));

    sink.clear();
    run(&mut app, &[format!("pins delete {first}").as_str()], &mut sink);
    assert_eq!(fixture.store.list_pins(&user_id).expect("pins").len(), 1);
    let map = app.map().expect("map page");
    assert_eq!(map.pins().len(), 1);
    assert_eq!(map.pins()[0].id, second);
    assert!(sink
        .iter()
        .any(|command| matches!(command, MapCommand::DrawPins(pins) if pins.len() == 1)));

    sink.clear();
    run(&mut app, &["pins view nope"], &mut sink);
    assert_eq!(notices(&sink), vec!["No pin nope"]);
}

#[test]
fn first_timeline_view_shows_existing_history() {
    let dir = tempfile::tempdir().expect("temp dir");
    let fixture = fixture();
    let mut app = signed_in_app(&fixture, dir.path());
    let user_id = app.session().user_id().expect("user").to_string();
    fixture
        .store
        .record_location(NewLocation {
            user_id,
            position: point(21.3069, -157.8583),
            timestamp: None,
            theme: ThemeId::Gta5,
        })
        .expect("record");

    let mut sink = Vec::new();
    run(&mut app, &["timeline all"], &mut sink);
    let shown = notices(&sink);
    assert_eq!(shown.first(), Some(&"All Time (1 locations)"));
    assert!(shown.iter().all(|message| *message != "No location data available"));
}

#[test]
fn search_and_goto_from_the_shell() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut fixture = fixture();
    fixture.services.geocoder = Arc::new(FixedGeocoder::new(vec![
        Place::new("Rhodes, Lemoyne", point(33.0, -85.0)),
        Place::new("Rhodes, Greece", point(36.43, 28.22)),
    ]));
    let mut app = signed_in_app(&fixture, dir.path());
    let mut sink = Vec::new();

    run(&mut app, &["search rhodes", "goto 2", "layer street"], &mut sink);
    let flights: Vec<GeoPoint> = sink
        .iter()
        .filter_map(|command| match command {
            MapCommand::FlyTo(feature) => Some(feature.position),
            _ => None,
        })
        .collect();
    assert_eq!(flights, vec![point(33.0, -85.0), point(36.43, 28.22)]);
    assert_eq!(app.map().expect("map").base_layer(), BaseLayer::Street);

    sink.clear();
    run(&mut app, &["goto 3"], &mut sink);
    assert_eq!(notices(&sink), vec!["No search result 3"]);
}
