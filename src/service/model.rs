use jiff::{Timestamp, ToSpan, Zoned};
use serde::{Deserialize, Serialize};

use super::error::{ServiceError, ServiceResult};
use crate::geometry::GeoPoint;
use crate::theme::ThemeId;

pub const DEFAULT_SHARED_LOCATION_NAME: &str = "Shared Location";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(rename = "preferredTheme", default)]
    pub preferred_theme: ThemeId,
}

/// Token plus the user it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// A recorded point of the user's historical path.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRecord {
    pub id: String,
    pub user_id: String,
    pub position: GeoPoint,
    pub timestamp: Timestamp,
    pub theme: ThemeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub id: String,
    pub owner_id: String,
    pub position: GeoPoint,
    pub note: String,
    pub timestamp: Timestamp,
    pub theme: ThemeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SharedLocation {
    pub id: String,
    pub user_id: String,
    pub shared_by: Option<String>,
    pub position: GeoPoint,
    pub name: String,
    pub timestamp: Timestamp,
    pub theme: ThemeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub user_id: String,
    pub position: GeoPoint,
    pub timestamp: Option<Timestamp>,
    pub theme: ThemeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPin {
    pub user_id: String,
    pub position: GeoPoint,
    pub note: String,
    pub theme: ThemeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSharedLocation {
    pub user_id: String,
    pub shared_by: Option<String>,
    pub position: GeoPoint,
    pub name: Option<String>,
    pub theme: ThemeId,
}

impl NewSharedLocation {
    pub fn resolved_name(&self) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_SHARED_LOCATION_NAME)
            .to_string()
    }
}

/// Time window for the location history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    #[default]
    Today,
    Yesterday,
    Week,
    All,
}

/// Half-open `[start, end)` range; a missing bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

impl TimeRange {
    pub const UNBOUNDED: TimeRange = TimeRange {
        start: None,
        end: None,
    };

    pub fn contains(&self, timestamp: Timestamp) -> bool {
        self.start.map_or(true, |start| timestamp >= start)
            && self.end.map_or(true, |end| timestamp < end)
    }
}

impl TimeFilter {
    pub const ALL: [TimeFilter; 4] = [Self::Today, Self::Yesterday, Self::Week, Self::All];

    pub const fn as_query(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Week => "week",
            Self::All => "all",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Yesterday => "Yesterday",
            Self::Week => "Last 7 Days",
            Self::All => "All Time",
        }
    }

    /// Resolves the window relative to `now`, using its time zone for midnight.
    pub fn range_at(self, now: &Zoned) -> ServiceResult<TimeRange> {
        let range = match self {
            Self::Today => TimeRange {
                start: Some(now.start_of_day()?.timestamp()),
                end: None,
            },
            Self::Yesterday => {
                let today = now.start_of_day()?;
                let yesterday = today.checked_sub(1.day())?.start_of_day()?;
                TimeRange {
                    start: Some(yesterday.timestamp()),
                    end: Some(today.timestamp()),
                }
            }
            // Calendar days, so a DST change inside the week keeps the wall-clock time.
            Self::Week => TimeRange {
                start: Some(now.checked_sub(7.days())?.timestamp()),
                end: None,
            },
            Self::All => TimeRange::UNBOUNDED,
        };
        Ok(range)
    }

    pub fn range_now(self) -> ServiceResult<TimeRange> {
        self.range_at(&Zoned::now())
    }
}

impl std::fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_query())
    }
}

impl std::str::FromStr for TimeFilter {
    type Err = ServiceError;

    fn from_str(value: &str) -> ServiceResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            // the map view historically asked for "day"
            "today" | "day" => Ok(Self::Today),
            "yesterday" => Ok(Self::Yesterday),
            "week" => Ok(Self::Week),
            "all" | "" => Ok(Self::All),
            other => Err(ServiceError::UnknownTimeFilter(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon() -> Zoned {
        "2025-03-12T12:30:00+00:00[UTC]".parse().expect("valid zoned time")
    }

    fn ts(value: &str) -> Timestamp {
        value.parse().expect("valid timestamp")
    }

    #[test]
    fn today_starts_at_local_midnight() {
        let range = TimeFilter::Today.range_at(&noon()).expect("range");
        assert_eq!(range.start, Some(ts("2025-03-12T00:00:00Z")));
        assert!(range.contains(ts("2025-03-12T00:00:00Z")));
        assert!(!range.contains(ts("2025-03-11T23:59:59Z")));
    }

    #[test]
    fn yesterday_is_half_open_day() {
        let range = TimeFilter::Yesterday.range_at(&noon()).expect("range");
        assert!(range.contains(ts("2025-03-11T00:00:00Z")));
        assert!(range.contains(ts("2025-03-11T23:59:59.999Z")));
        assert!(!range.contains(ts("2025-03-12T00:00:00Z")));
        assert!(!range.contains(ts("2025-03-10T23:59:59Z")));
    }

    #[test]
    fn week_reaches_back_seven_days_from_now() {
        let range = TimeFilter::Week.range_at(&noon()).expect("range");
        assert_eq!(range.start, Some(ts("2025-03-05T12:30:00Z")));
        assert_eq!(TimeFilter::All.range_at(&noon()).expect("range"), TimeRange::UNBOUNDED);
    }

    #[test]
    fn week_keeps_local_time_across_a_dst_change() {
        let new_york = jiff::tz::TimeZone::posix("EST5EDT,M3.2.0,M11.1.0").expect("posix zone");
        // 12:00 EDT, three days after clocks sprang forward
        let now = ts("2025-03-12T16:00:00Z").to_zoned(new_york);
        let range = TimeFilter::Week.range_at(&now).expect("range");
        // 12:00 EST a week earlier
        assert_eq!(range.start, Some(ts("2025-03-05T17:00:00Z")));
    }

    #[test]
    fn time_filter_parses_day_as_today() {
        assert_eq!("day".parse::<TimeFilter>().expect("parse"), TimeFilter::Today);
        assert_eq!("WEEK".parse::<TimeFilter>().expect("parse"), TimeFilter::Week);
        assert!("fortnight".parse::<TimeFilter>().is_err());
    }

    #[test]
    fn shared_location_name_defaults_when_blank() {
        let position = GeoPoint::new(1.0, 1.0).expect("valid");
        let mut shared = NewSharedLocation {
            user_id: "u1".to_string(),
            shared_by: None,
            position,
            name: Some("   ".to_string()),
            theme: ThemeId::Gta5,
        };
        assert_eq!(shared.resolved_name(), "Shared Location");
        shared.name = Some("Camp".to_string());
        assert_eq!(shared.resolved_name(), "Camp");
    }
}
