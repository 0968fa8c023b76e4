use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use super::{
    BusinessHoursRule, DataSourceResult, LocationDataSource, LocationStatus, StatusObservation,
    TimezoneRecord,
};

/// Location data held in memory. Observations keep their insertion order,
/// which stands in for the source's write order when timestamps tie.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLocationData {
    data: Arc<RwLock<MemoryData>>,
}

#[derive(Debug, Default)]
struct MemoryData {
    observations: Vec<StatusObservation>,
    schedules: HashMap<String, Vec<BusinessHoursRule>>,
    timezones: HashMap<String, TimezoneRecord>,
}

impl InMemoryLocationData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_observation(
        &self,
        location_id: &str,
        timestamp_utc: DateTime<Utc>,
        status: LocationStatus,
    ) {
        let mut data = self.data.write().unwrap_or_else(|err| err.into_inner());
        data.observations.push(StatusObservation {
            location_id: location_id.to_string(),
            timestamp_utc,
            status,
        });
    }

    pub fn push_rule(&self, rule: BusinessHoursRule) {
        let mut data = self.data.write().unwrap_or_else(|err| err.into_inner());
        data.schedules
            .entry(rule.location_id.clone())
            .or_default()
            .push(rule);
    }

    pub fn set_timezone(&self, location_id: &str, timezone_str: &str) {
        let mut data = self.data.write().unwrap_or_else(|err| err.into_inner());
        data.timezones.insert(
            location_id.to_string(),
            TimezoneRecord {
                location_id: location_id.to_string(),
                timezone_str: timezone_str.to_string(),
            },
        );
    }
}

#[async_trait]
impl LocationDataSource for InMemoryLocationData {
    async fn fetch_observations(
        &self,
        location_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DataSourceResult<Vec<StatusObservation>> {
        let data = self.data.read().unwrap_or_else(|err| err.into_inner());
        let mut rows: Vec<StatusObservation> = data
            .observations
            .iter()
            .filter(|obs| obs.location_id == location_id)
            .filter(|obs| obs.timestamp_utc >= start && obs.timestamp_utc <= end)
            .cloned()
            .collect();
        // Stable sort keeps insertion order among equal timestamps.
        rows.sort_by_key(|obs| obs.timestamp_utc);
        Ok(rows)
    }

    async fn fetch_schedule(&self, location_id: &str) -> DataSourceResult<Vec<BusinessHoursRule>> {
        let data = self.data.read().unwrap_or_else(|err| err.into_inner());
        Ok(data.schedules.get(location_id).cloned().unwrap_or_default())
    }

    async fn fetch_timezone(&self, location_id: &str) -> DataSourceResult<Option<TimezoneRecord>> {
        let data = self.data.read().unwrap_or_else(|err| err.into_inner());
        Ok(data.timezones.get(location_id).cloned())
    }

    async fn list_all_location_ids(&self) -> DataSourceResult<Vec<String>> {
        let data = self.data.read().unwrap_or_else(|err| err.into_inner());
        let ids: BTreeSet<&str> = data
            .observations
            .iter()
            .map(|obs| obs.location_id.as_str())
            .collect();
        Ok(ids.into_iter().map(str::to_string).collect())
    }

    async fn max_observed_timestamp(&self) -> DataSourceResult<Option<DateTime<Utc>>> {
        let data = self.data.read().unwrap_or_else(|err| err.into_inner());
        Ok(data.observations.iter().map(|obs| obs.timestamp_utc).max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn fetch_is_inclusive_and_keeps_write_order_on_ties() {
        let data = InMemoryLocationData::new();
        let t0 = Utc.with_ymd_and_hms(2023, 1, 24, 12, 0, 0).single().expect("t0");
        data.push_observation("S1", t0 + Duration::hours(1), LocationStatus::Active);
        data.push_observation("S1", t0, LocationStatus::Inactive);
        data.push_observation("S1", t0, LocationStatus::Active);
        data.push_observation("S1", t0 + Duration::hours(2), LocationStatus::Active);
        data.push_observation("S2", t0, LocationStatus::Active);

        let rows = data
            .fetch_observations("S1", t0, t0 + Duration::hours(1))
            .await
            .expect("fetch");
        let statuses: Vec<LocationStatus> = rows.iter().map(|obs| obs.status).collect();
        assert_eq!(
            statuses,
            vec![
                LocationStatus::Inactive,
                LocationStatus::Active,
                LocationStatus::Active
            ]
        );
        assert_eq!(
            data.max_observed_timestamp().await.expect("max"),
            Some(t0 + Duration::hours(2))
        );
        assert_eq!(
            data.list_all_location_ids().await.expect("ids"),
            vec!["S1".to_string(), "S2".to_string()]
        );
    }
}
