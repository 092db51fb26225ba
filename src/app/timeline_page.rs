use jiff::tz::TimeZone;

use super::Services;
use crate::service::{LocationRecord, ServiceResult, TimeFilter};
use crate::theme::ThemeId;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One rendered row of the location history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineRow {
    pub time: String,
    pub latitude: String,
    pub longitude: String,
    pub theme: ThemeId,
}

pub struct TimelinePage {
    services: Services,
    user_id: String,
    filter: TimeFilter,
    time_zone: TimeZone,
    locations: Vec<LocationRecord>,
}

impl TimelinePage {
    /// Starts unfiltered, showing the whole history.
    pub fn new(services: Services, user_id: impl Into<String>) -> Self {
        Self {
            services,
            user_id: user_id.into(),
            filter: TimeFilter::All,
            time_zone: TimeZone::system(),
            locations: Vec::new(),
        }
    }

    pub fn with_time_zone(mut self, time_zone: TimeZone) -> Self {
        self.time_zone = time_zone;
        self
    }

    pub fn filter(&self) -> TimeFilter {
        self.filter
    }

    pub fn locations(&self) -> &[LocationRecord] {
        &self.locations
    }

    /// Selects `filter` and refetches, also when it is already the current one.
    pub fn set_filter(&mut self, filter: TimeFilter) -> ServiceResult<()> {
        if filter != self.filter {
            tracing::debug!(from = %self.filter, to = %filter, "timeline filter changed");
        }
        self.filter = filter;
        self.refresh()
    }

    pub fn refresh(&mut self) -> ServiceResult<()> {
        match self
            .services
            .locations
            .list_locations(&self.user_id, self.filter)
        {
            Ok(locations) => {
                tracing::info!(filter = %self.filter, count = locations.len(), "timeline refreshed");
                self.locations = locations;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "failed to fetch location history");
                Err(err)
            }
        }
    }

    /// Deletes the history covered by the current filter, then refetches.
    pub fn clear_history(&mut self) -> ServiceResult<usize> {
        let deleted = self
            .services
            .locations
            .delete_locations(&self.user_id, self.filter)
            .inspect_err(|err| tracing::warn!(%err, "failed to delete location history"))?;
        tracing::info!(filter = %self.filter, deleted, "location history cleared");
        self.refresh()?;
        Ok(deleted)
    }

    pub fn rows(&self) -> Vec<TimelineRow> {
        self.locations
            .iter()
            .map(|record| TimelineRow {
                time: record
                    .timestamp
                    .to_zoned(self.time_zone.clone())
                    .strftime(TIME_FORMAT)
                    .to_string(),
                latitude: format!("{:.6}", record.position.lat()),
                longitude: format!("{:.6}", record.position.lng()),
                theme: record.theme,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
