use super::Services;
use crate::service::{Pin, ServiceResult};
use crate::state::SelectedFeature;

pub struct PinsPage {
    services: Services,
    user_id: String,
    pins: Vec<Pin>,
}

impl PinsPage {
    pub fn new(services: Services, user_id: impl Into<String>) -> Self {
        Self {
            services,
            user_id: user_id.into(),
            pins: Vec::new(),
        }
    }

    /// Newest first.
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub fn refresh(&mut self) -> ServiceResult<()> {
        self.pins = self
            .services
            .locations
            .list_pins(&self.user_id)
            .inspect_err(|err| tracing::warn!(%err, "failed to fetch pins"))?;
        tracing::info!(count = self.pins.len(), "pins refreshed");
        Ok(())
    }

    pub fn delete(&mut self, pin_id: &str) -> ServiceResult<()> {
        self.services
            .locations
            .delete_pin(pin_id)
            .inspect_err(|err| tracing::warn!(%err, pin = pin_id, "failed to delete pin"))?;
        tracing::info!(pin = pin_id, "pin deleted");
        self.refresh()
    }

    /// The feature the map page should fly to for this pin.
    pub fn view_on_map(&self, pin_id: &str) -> Option<SelectedFeature> {
        self.pins
            .iter()
            .find(|pin| pin.id == pin_id)
            .map(|pin| SelectedFeature::pin(pin.position))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::geometry::GeoPoint;
    use crate::service::{LocationService, MemoryLocationService, NewPin, ServiceError};
    use crate::state::FeatureKind;
    use crate::theme::ThemeId;

    #[test]
    fn view_on_map_targets_pin_at_street_zoom_and_delete_refreshes() {
        let store = Arc::new(MemoryLocationService::new());
        let position = GeoPoint::new(34.05, -118.25).expect("point");
        let pin = store
            .create_pin(NewPin {
                user_id: "u1".to_string(),
                position,
                note: "Vinewood sign".to_string(),
                theme: ThemeId::Gta5,
            })
            .expect("pin");

        let mut page = PinsPage::new(Services::in_memory(store), "u1");
        page.refresh().expect("refresh");
        assert_eq!(page.pins().len(), 1);

        let feature = page.view_on_map(&pin.id).expect("feature");
        assert_eq!(feature.kind, FeatureKind::Pin);
        assert_eq!(feature.position, position);
        assert_eq!(feature.zoom, 15);
        assert!(page.view_on_map("missing").is_none());

        page.delete(&pin.id).expect("delete");
        assert!(page.pins().is_empty());
        assert!(matches!(page.delete(&pin.id), Err(ServiceError::NotFound(_))));
    }
}
