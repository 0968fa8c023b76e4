use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    Active,
    Inactive,
}

impl LocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationStatus::Active => "active",
            LocationStatus::Inactive => "inactive",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LocationStatus::Active)
    }
}

impl fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(LocationStatus::Active),
            "inactive" => Ok(LocationStatus::Inactive),
            other => Err(format!("unknown location status: {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusObservation {
    pub location_id: String,
    pub timestamp_utc: DateTime<Utc>,
    pub status: LocationStatus,
}

/// One opening window on a weekday, in the location's local civil time.
/// `day_of_week` counts from Monday = 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessHoursRule {
    pub location_id: String,
    pub day_of_week: u8,
    pub start_time_local: NaiveTime,
    pub end_time_local: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimezoneRecord {
    pub location_id: String,
    pub timezone_str: String,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub(crate) struct StatusObservationRow {
    pub location_id: String,
    pub timestamp_utc: DateTime<Utc>,
    pub status: String,
}

impl StatusObservationRow {
    pub(crate) fn into_observation(self) -> Result<StatusObservation, String> {
        let status = self.status.parse::<LocationStatus>()?;
        Ok(StatusObservation {
            location_id: self.location_id,
            timestamp_utc: self.timestamp_utc,
            status,
        })
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub(crate) struct BusinessHoursRow {
    pub location_id: String,
    pub day_of_week: i16,
    pub start_time_local: NaiveTime,
    pub end_time_local: NaiveTime,
}

impl BusinessHoursRow {
    pub(crate) fn into_rule(self) -> Result<BusinessHoursRule, String> {
        let day_of_week = u8::try_from(self.day_of_week)
            .ok()
            .filter(|day| *day <= 6)
            .ok_or_else(|| format!("day_of_week out of range: {}", self.day_of_week))?;
        Ok(BusinessHoursRule {
            location_id: self.location_id,
            day_of_week,
            start_time_local: self.start_time_local,
            end_time_local: self.end_time_local,
        })
    }
}
