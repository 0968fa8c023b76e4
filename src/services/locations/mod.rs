//! Read-only access to the per-location observation, schedule and timezone
//! data the uptime engine consumes.

mod memory;
mod postgres;
mod types;

pub mod ingest;

pub use memory::InMemoryLocationData;
pub use postgres::PgLocationData;
pub use types::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("database query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid stored record for location {location_id}: {message}")]
    InvalidRecord {
        location_id: String,
        message: String,
    },
}

pub type DataSourceResult<T> = Result<T, DataSourceError>;

#[async_trait]
pub trait LocationDataSource: Send + Sync {
    /// Observations with `start <= timestamp_utc <= end`, ordered by timestamp
    /// and then by the order the source recorded them.
    async fn fetch_observations(
        &self,
        location_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DataSourceResult<Vec<StatusObservation>>;

    /// Empty when the location has no recorded business hours.
    async fn fetch_schedule(&self, location_id: &str) -> DataSourceResult<Vec<BusinessHoursRule>>;

    async fn fetch_timezone(&self, location_id: &str) -> DataSourceResult<Option<TimezoneRecord>>;

    async fn list_all_location_ids(&self) -> DataSourceResult<Vec<String>>;

    async fn max_observed_timestamp(&self) -> DataSourceResult<Option<DateTime<Utc>>>;
}
