use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::types::{BusinessHoursRow, StatusObservationRow};
use super::{
    BusinessHoursRule, DataSourceError, DataSourceResult, LocationDataSource, StatusObservation,
    TimezoneRecord,
};

#[derive(Debug, Clone)]
pub struct PgLocationData {
    db: PgPool,
}

impl PgLocationData {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LocationDataSource for PgLocationData {
    async fn fetch_observations(
        &self,
        location_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DataSourceResult<Vec<StatusObservation>> {
        let rows: Vec<StatusObservationRow> = sqlx::query_as(
            r#"
            SELECT location_id, timestamp_utc, status
            FROM location_status
            WHERE location_id = $1
              AND timestamp_utc >= $2
              AND timestamp_utc <= $3
            ORDER BY timestamp_utc ASC, id ASC
            "#,
        )
        .bind(location_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                row.into_observation()
                    .map_err(|message| DataSourceError::InvalidRecord {
                        location_id: location_id.to_string(),
                        message,
                    })
            })
            .collect()
    }

    async fn fetch_schedule(&self, location_id: &str) -> DataSourceResult<Vec<BusinessHoursRule>> {
        let rows: Vec<BusinessHoursRow> = sqlx::query_as(
            r#"
            SELECT location_id, day_of_week, start_time_local, end_time_local
            FROM business_hours
            WHERE location_id = $1
            ORDER BY day_of_week ASC, start_time_local ASC
            "#,
        )
        .bind(location_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                row.into_rule().map_err(|message| DataSourceError::InvalidRecord {
                    location_id: location_id.to_string(),
                    message,
                })
            })
            .collect()
    }

    async fn fetch_timezone(&self, location_id: &str) -> DataSourceResult<Option<TimezoneRecord>> {
        let row: Option<(String, String)> = sqlx::query_as(
            r#"
            SELECT location_id, timezone_str
            FROM location_timezones
            WHERE location_id = $1
            LIMIT 1
            "#,
        )
        .bind(location_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(location_id, timezone_str)| TimezoneRecord {
            location_id,
            timezone_str,
        }))
    }

    async fn list_all_location_ids(&self) -> DataSourceResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT location_id
            FROM location_status
            ORDER BY location_id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn max_observed_timestamp(&self) -> DataSourceResult<Option<DateTime<Utc>>> {
        let row: (Option<DateTime<Utc>>,) =
            sqlx::query_as("SELECT MAX(timestamp_utc) FROM location_status")
                .fetch_one(&self.db)
                .await?;
        Ok(row.0)
    }
}
