use std::collections::VecDeque;

use super::error::{StateError, StateResult};
use super::event::{
    Activation, ClickOutcome, ModeTransition, PositionDelivery, PositionOutcome, PositionRequest,
    RouteDelivery, RouteRequest, Severity, TransitionCause,
};
use super::model::{SelectedFeature, ToolMode, TrackingSession};
use crate::geometry::{GeoPoint, PositionFix, Route};

const HISTORY_LIMIT: usize = 50;

/// Owns the active map tool, its tracking points and the one-shot selected feature.
///
/// Performs no I/O. Collaborator work is requested through the returned outcomes and
/// answered later via `deliver_route` / `deliver_position`, tagged with the generation
/// that was current when the request was issued.
#[derive(Debug)]
pub struct MapStateMachine {
    session: TrackingSession,
    selected_feature: Option<SelectedFeature>,
    route: Option<Route>,
    last_fix: Option<PositionFix>,
    generation: u64,
    transition_history: VecDeque<ModeTransition>,
}

impl MapStateMachine {
    pub fn new() -> Self {
        Self {
            session: TrackingSession::default(),
            selected_feature: None,
            route: None,
            last_fix: None,
            generation: 0,
            transition_history: VecDeque::with_capacity(HISTORY_LIMIT),
        }
    }

    pub fn mode(&self) -> ToolMode {
        self.session.mode()
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    pub fn points(&self) -> &[GeoPoint] {
        self.session.points()
    }

    pub fn selected_feature(&self) -> Option<&SelectedFeature> {
        self.selected_feature.as_ref()
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn last_fix(&self) -> Option<PositionFix> {
        self.last_fix
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn history(&self) -> impl ExactSizeIterator<Item = &ModeTransition> {
        self.transition_history.iter()
    }

    /// Location picked in add-location mode, waiting for the pin form.
    pub fn pending_pin(&self) -> Option<GeoPoint> {
        match self.mode() {
            ToolMode::AddLocation => self.session.points().first().copied(),
            _ => None,
        }
    }

    pub fn instructions(&self) -> Option<String> {
        self.mode().instructions(self.session.len())
    }

    pub fn activate(&mut self, mode: ToolMode) -> Activation {
        tracing::debug!(from = ?self.mode(), to = ?mode, "request tool activation");
        if mode == self.mode() {
            return Activation::Unchanged;
        }

        self.enter(mode, TransitionCause::Activate);

        if !mode.needs_position() {
            return Activation::Ready;
        }

        match self.last_fix {
            Some(fix) => Activation::Completed(self.complete_position(fix)),
            None => Activation::NeedsPosition(PositionRequest {
                generation: self.generation,
                mode,
            }),
        }
    }

    pub fn handle_map_click(&mut self, point: GeoPoint) -> ClickOutcome {
        let mode = self.mode();
        tracing::debug!(?mode, %point, "map click");

        let outcome = match mode {
            ToolMode::None => ClickOutcome::Forward(point),
            ToolMode::AddLocation => {
                self.session.clear();
                self.session.push(point);
                ClickOutcome::OpenPinForm(point)
            }
            ToolMode::MeasureDistance => {
                self.session.push(point);
                ClickOutcome::Measured {
                    total_m: self.session.total_distance_m(),
                    point_count: self.session.len(),
                }
            }
            ToolMode::Directions => self.place_direction_point(point),
            ToolMode::FindMe | ToolMode::ShareLocation => ClickOutcome::Ignored,
        };

        self.assert_invariants();
        outcome
    }

    /// Cancel whatever is in progress. Always safe to call.
    pub fn reset(&mut self) {
        tracing::debug!(from = ?self.mode(), "reset map interaction");
        self.enter(ToolMode::None, TransitionCause::Reset);
        self.selected_feature = None;
    }

    pub fn select_feature(&mut self, feature: SelectedFeature) {
        self.selected_feature = Some(feature);
    }

    /// Hands the selected feature to the renderer exactly once.
    pub fn take_selected_feature(&mut self) -> Option<SelectedFeature> {
        self.selected_feature.take()
    }

    /// Passive context from periodic tracking; never changes the mode.
    pub fn update_fix(&mut self, fix: PositionFix) {
        self.last_fix = Some(fix);
    }

    pub fn deliver_route(
        &mut self,
        generation: u64,
        result: Result<Route, Severity>,
    ) -> RouteDelivery {
        if generation != self.generation || self.mode() != ToolMode::Directions {
            tracing::debug!(
                generation,
                current = self.generation,
                "dropping stale route response"
            );
            return RouteDelivery::Stale;
        }

        let delivery = match result {
            Ok(route) => {
                self.route = Some(route);
                RouteDelivery::Applied
            }
            Err(Severity::Recoverable) => {
                self.route = None;
                RouteDelivery::Failed { reverted: false }
            }
            Err(Severity::Unrecoverable) => {
                self.enter(ToolMode::None, TransitionCause::CollaboratorFailure);
                RouteDelivery::Failed { reverted: true }
            }
        };
        self.assert_invariants();
        delivery
    }

    /// Any failure ends the one-shot mode, since there is no click to retry with.
    pub fn deliver_position(
        &mut self,
        generation: u64,
        result: Result<PositionFix, Severity>,
    ) -> PositionDelivery {
        if generation != self.generation || !self.mode().needs_position() {
            tracing::debug!(
                generation,
                current = self.generation,
                "dropping stale position response"
            );
            return PositionDelivery::Stale;
        }

        match result {
            Ok(fix) => {
                self.last_fix = Some(fix);
                PositionDelivery::Resolved(self.complete_position(fix))
            }
            Err(severity) => {
                tracing::warn!(?severity, mode = ?self.mode(), "position unavailable");
                self.enter(ToolMode::None, TransitionCause::CollaboratorFailure);
                PositionDelivery::Failed
            }
        }
    }

    pub fn check_invariants(&self) -> StateResult<()> {
        let mode = self.mode();
        let points = self.session.len();
        if let Some(max) = mode.max_points() {
            if points > max {
                return Err(StateError::TooManyPoints { mode, points, max });
            }
        }
        if self.route.is_some() && (mode != ToolMode::Directions || points != 2) {
            return Err(StateError::OrphanRoute { mode, points });
        }
        Ok(())
    }

    fn assert_invariants(&self) {
        if let Err(err) = self.check_invariants() {
            tracing::error!(%err, "map interaction invariant violated");
            debug_assert!(false, "{err}");
        }
    }

    fn place_direction_point(&mut self, point: GeoPoint) -> ClickOutcome {
        match self.session.points() {
            [] => {
                self.session.push(point);
                ClickOutcome::OriginSet(point)
            }
            [origin, rest @ ..] => {
                let origin = *origin;
                if rest.is_empty() {
                    self.session.push(point);
                } else {
                    self.session.replace_last(point);
                }
                self.route = None;
                self.generation = self.generation.wrapping_add(1);
                ClickOutcome::RequestRoute(RouteRequest {
                    generation: self.generation,
                    origin,
                    destination: point,
                })
            }
        }
    }

    fn complete_position(&mut self, fix: PositionFix) -> PositionOutcome {
        let outcome = match self.mode() {
            ToolMode::FindMe => {
                let feature = SelectedFeature::current_location(fix.position);
                self.selected_feature = Some(feature);
                PositionOutcome::Focus(feature)
            }
            _ => PositionOutcome::Share(fix.position),
        };
        self.enter(ToolMode::None, TransitionCause::Completed);
        outcome
    }

    fn enter(&mut self, mode: ToolMode, cause: TransitionCause) {
        let from = self.mode();
        self.generation = self.generation.wrapping_add(1);
        self.session = TrackingSession::new(mode);
        self.route = None;

        if self.transition_history.len() == HISTORY_LIMIT {
            self.transition_history.pop_front();
        }
        self.transition_history
            .push_back(ModeTransition::new(from, mode, cause, self.generation));
        tracing::debug!(?from, to = ?mode, ?cause, generation = self.generation, "tool mode changed");
    }
}

impl Default for MapStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MapStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ToolMode::{:?} ({} points, generation {})",
            self.mode(),
            self.session.len(),
            self.generation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::haversine_m;
    use crate::state::FeatureKind;

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).expect("valid test coordinate")
    }

    fn fix(lat: f64, lng: f64) -> PositionFix {
        PositionFix::new(point(lat, lng), Some(12.0))
    }

    fn route_request(outcome: ClickOutcome) -> RouteRequest {
        match outcome {
            ClickOutcome::RequestRoute(request) => request,
            other => panic!("expected route request, got {other:?}"),
        }
    }

    #[test]
    fn activate_always_starts_with_empty_points() {
        let mut machine = MapStateMachine::new();
        machine.activate(ToolMode::MeasureDistance);
        machine.handle_map_click(point(0.0, 0.0));
        machine.handle_map_click(point(0.0, 1.0));

        assert_eq!(machine.activate(ToolMode::Directions), Activation::Ready);
        assert!(machine.points().is_empty());

        machine.handle_map_click(point(1.0, 1.0));
        assert_eq!(machine.activate(ToolMode::MeasureDistance), Activation::Ready);
        assert!(machine.points().is_empty());
    }

    #[test]
    fn activating_the_current_mode_is_a_no_op() {
        let mut machine = MapStateMachine::new();
        machine.activate(ToolMode::MeasureDistance);
        machine.handle_map_click(point(0.0, 0.0));
        let generation = machine.generation();

        assert_eq!(
            machine.activate(ToolMode::MeasureDistance),
            Activation::Unchanged
        );
        assert_eq!(machine.points(), &[point(0.0, 0.0)]);
        assert_eq!(machine.generation(), generation);
    }

    #[test]
    fn measure_total_matches_sum_of_segments() {
        let mut machine = MapStateMachine::new();
        machine.activate(ToolMode::MeasureDistance);
        let clicks = [
            point(0.0, 0.0),
            point(0.0, 1.0),
            point(45.0, 10.0),
            point(-33.9, 151.2),
            point(51.5, -0.1),
        ];

        let mut expected = 0.0;
        for (index, click) in clicks.iter().enumerate() {
            if index > 0 {
                expected += haversine_m(clicks[index - 1], *click);
            }
            let ClickOutcome::Measured {
                total_m,
                point_count,
            } = machine.handle_map_click(*click)
            else {
                panic!("measure click should report a distance");
            };
            assert_eq!(point_count, index + 1);
            let tolerance = expected.abs().max(1.0) * 1e-6;
            assert!((total_m - expected).abs() <= tolerance);
        }
    }

    #[test]
    fn one_degree_at_equator_measures_about_111_km() {
        let mut machine = MapStateMachine::new();
        machine.activate(ToolMode::MeasureDistance);
        machine.handle_map_click(point(0.0, 0.0));
        let outcome = machine.handle_map_click(point(0.0, 1.0));
        let ClickOutcome::Measured { total_m, .. } = outcome else {
            panic!("expected measured outcome");
        };
        assert!((total_m / 1000.0 - 111.19).abs() < 0.01);
    }

    #[test]
    fn directions_third_click_replaces_destination() {
        let (a, b, c) = (point(10.0, 10.0), point(11.0, 11.0), point(12.0, 12.0));
        let mut machine = MapStateMachine::new();
        machine.activate(ToolMode::Directions);

        assert_eq!(machine.handle_map_click(a), ClickOutcome::OriginSet(a));
        let first = route_request(machine.handle_map_click(b));
        assert_eq!(machine.points(), &[a, b]);
        assert_eq!((first.origin, first.destination), (a, b));

        let second = route_request(machine.handle_map_click(c));
        assert_eq!(machine.points(), &[a, c]);
        assert_eq!((second.origin, second.destination), (a, c));
        assert!(second.generation > first.generation);
        assert_eq!(machine.mode(), ToolMode::Directions);
    }

    #[test]
    fn stale_route_responses_are_ignored() {
        let mut machine = MapStateMachine::new();
        machine.activate(ToolMode::Directions);
        machine.handle_map_click(point(0.0, 0.0));
        let first = route_request(machine.handle_map_click(point(0.0, 1.0)));
        let second = route_request(machine.handle_map_click(point(0.0, 2.0)));

        let stale = machine.deliver_route(first.generation, Ok(Route::new(vec![point(5.0, 5.0)])));
        assert_eq!(stale, RouteDelivery::Stale);
        assert!(machine.route().is_none());

        let route = Route::new(vec![point(0.0, 0.0), point(0.0, 1.0), point(0.0, 2.0)]);
        let applied = machine.deliver_route(second.generation, Ok(route.clone()));
        assert_eq!(applied, RouteDelivery::Applied);
        assert_eq!(machine.route(), Some(&route));
    }

    #[test]
    fn reset_between_request_and_response_discards_route() {
        let mut machine = MapStateMachine::new();
        machine.activate(ToolMode::Directions);
        machine.handle_map_click(point(0.0, 0.0));
        let request = route_request(machine.handle_map_click(point(0.0, 1.0)));
        machine.reset();

        let delivery = machine.deliver_route(request.generation, Ok(Route::new(vec![point(0.0, 0.0)])));
        assert_eq!(delivery, RouteDelivery::Stale);
        assert!(machine.route().is_none());
        assert_eq!(machine.mode(), ToolMode::None);
    }

    #[test]
    fn unrecoverable_route_failure_reverts_to_none() {
        let mut machine = MapStateMachine::new();
        machine.activate(ToolMode::Directions);
        machine.handle_map_click(point(0.0, 0.0));
        let request = route_request(machine.handle_map_click(point(0.0, 1.0)));

        let delivery = machine.deliver_route(request.generation, Err(Severity::Unrecoverable));
        assert_eq!(delivery, RouteDelivery::Failed { reverted: true });
        assert_eq!(machine.mode(), ToolMode::None);
        assert!(machine.points().is_empty());
    }

    #[test]
    fn recoverable_route_failure_keeps_session() {
        let mut machine = MapStateMachine::new();
        machine.activate(ToolMode::Directions);
        machine.handle_map_click(point(0.0, 0.0));
        let request = route_request(machine.handle_map_click(point(0.0, 1.0)));

        let delivery = machine.deliver_route(request.generation, Err(Severity::Recoverable));
        assert_eq!(delivery, RouteDelivery::Failed { reverted: false });
        assert_eq!(machine.mode(), ToolMode::Directions);
        assert_eq!(machine.points().len(), 2);
    }

    #[test]
    fn reset_from_any_state_clears_everything() {
        for mode in [
            ToolMode::None,
            ToolMode::AddLocation,
            ToolMode::MeasureDistance,
            ToolMode::Directions,
            ToolMode::FindMe,
            ToolMode::ShareLocation,
        ] {
            let mut machine = MapStateMachine::new();
            machine.select_feature(SelectedFeature::pin(point(1.0, 1.0)));
            machine.activate(mode);
            machine.handle_map_click(point(3.0, 3.0));
            machine.handle_map_click(point(4.0, 4.0));

            machine.reset();
            assert_eq!(machine.mode(), ToolMode::None, "{mode:?}");
            assert!(machine.points().is_empty(), "{mode:?}");
            assert!(machine.selected_feature().is_none(), "{mode:?}");
            assert!(machine.route().is_none(), "{mode:?}");
        }
    }

    #[test]
    fn add_location_holds_a_single_pending_pin() {
        let mut machine = MapStateMachine::new();
        machine.activate(ToolMode::AddLocation);
        assert_eq!(
            machine.handle_map_click(point(1.0, 1.0)),
            ClickOutcome::OpenPinForm(point(1.0, 1.0))
        );
        machine.handle_map_click(point(2.0, 2.0));
        assert_eq!(machine.points(), &[point(2.0, 2.0)]);
        assert_eq!(machine.pending_pin(), Some(point(2.0, 2.0)));
        assert!(machine.check_invariants().is_ok());
    }

    #[test]
    fn clicks_without_a_tool_are_forwarded() {
        let mut machine = MapStateMachine::new();
        assert_eq!(
            machine.handle_map_click(point(5.0, 5.0)),
            ClickOutcome::Forward(point(5.0, 5.0))
        );
        assert!(machine.points().is_empty());
    }

    #[test]
    fn find_me_without_fix_requests_position_then_focuses() {
        let mut machine = MapStateMachine::new();
        let Activation::NeedsPosition(request) = machine.activate(ToolMode::FindMe) else {
            panic!("expected a position request");
        };
        assert_eq!(machine.handle_map_click(point(9.0, 9.0)), ClickOutcome::Ignored);

        let delivery = machine.deliver_position(request.generation, Ok(fix(48.85, 2.35)));
        let PositionDelivery::Resolved(PositionOutcome::Focus(feature)) = delivery else {
            panic!("expected focus outcome, got {delivery:?}");
        };
        assert_eq!(feature.kind, FeatureKind::CurrentLocation);
        assert_eq!(feature.zoom, 16);
        assert_eq!(machine.mode(), ToolMode::None);
        assert_eq!(machine.take_selected_feature(), Some(feature));
        assert!(machine.take_selected_feature().is_none());
    }

    #[test]
    fn share_with_known_fix_completes_immediately() {
        let mut machine = MapStateMachine::new();
        machine.update_fix(fix(40.7, -74.0));
        let activation = machine.activate(ToolMode::ShareLocation);
        assert_eq!(
            activation,
            Activation::Completed(PositionOutcome::Share(point(40.7, -74.0)))
        );
        assert_eq!(machine.mode(), ToolMode::None);
    }

    #[test]
    fn position_failure_ends_one_shot_mode() {
        let mut machine = MapStateMachine::new();
        let Activation::NeedsPosition(request) = machine.activate(ToolMode::ShareLocation) else {
            panic!("expected a position request");
        };
        let delivery = machine.deliver_position(request.generation, Err(Severity::Recoverable));
        assert_eq!(delivery, PositionDelivery::Failed);
        assert_eq!(machine.mode(), ToolMode::None);
    }

    #[test]
    fn late_position_after_mode_change_is_stale() {
        let mut machine = MapStateMachine::new();
        let Activation::NeedsPosition(request) = machine.activate(ToolMode::FindMe) else {
            panic!("expected a position request");
        };
        machine.activate(ToolMode::MeasureDistance);
        let delivery = machine.deliver_position(request.generation, Ok(fix(1.0, 1.0)));
        assert_eq!(delivery, PositionDelivery::Stale);
        assert!(machine.selected_feature().is_none());
        assert_eq!(machine.mode(), ToolMode::MeasureDistance);
    }

    #[test]
    fn transition_history_is_ordered_and_bounded() {
        let mut machine = MapStateMachine::new();
        machine.activate(ToolMode::MeasureDistance);
        machine.activate(ToolMode::Directions);
        machine.reset();

        let history: Vec<_> = machine.history().copied().collect();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].from, ToolMode::None);
        assert_eq!(history[0].to, ToolMode::MeasureDistance);
        assert_eq!(history[1].to, ToolMode::Directions);
        assert_eq!(history[2].cause, TransitionCause::Reset);

        for _ in 0..40 {
            machine.activate(ToolMode::MeasureDistance);
            machine.activate(ToolMode::AddLocation);
        }
        assert_eq!(machine.history().len(), HISTORY_LIMIT);
    }
}
