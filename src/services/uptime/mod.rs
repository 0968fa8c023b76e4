//! Uptime/downtime estimation: reconstruct a status step function from sparse
//! polls, restrict it to local business hours and aggregate it over trailing
//! windows ending at a fixed reference instant.

mod business_hours;
mod schedule;
mod timeline;
mod timezone;
mod windows;

pub use business_hours::BusinessCalendar;
pub use schedule::Schedule;
pub use timeline::{StatusInterval, StatusTimeline};
pub use timezone::{LocationTimezone, DEFAULT_TIMEZONE};
pub use windows::{aggregate_window, TrailingWindow, UptimeResult, WindowMetrics};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::services::locations::{DataSourceResult, LocationDataSource, StatusObservation};

/// Everything the estimate for one location depends on, already resolved.
#[derive(Debug, Clone)]
pub struct LocationInputs {
    pub location_id: String,
    pub calendar: BusinessCalendar,
    pub observations: Vec<StatusObservation>,
}

/// Reads the schedule, timezone and last-week observations for a location.
pub async fn resolve_inputs(
    source: &dyn LocationDataSource,
    location_id: &str,
    now: DateTime<Utc>,
    default_tz: Tz,
) -> DataSourceResult<LocationInputs> {
    let schedule = Schedule::resolve(source.fetch_schedule(location_id).await?);
    let timezone_record = source.fetch_timezone(location_id).await?;
    let timezone = LocationTimezone::resolve(timezone_record.as_ref(), default_tz);
    let observations = source
        .fetch_observations(location_id, TrailingWindow::LastWeek.start(now), now)
        .await?;

    let calendar = BusinessCalendar::new(schedule, timezone);
    tracing::debug!(
        location_id,
        default_schedule = calendar.schedule().is_default(),
        timezone = %calendar.tz().name(),
        default_timezone = matches!(calendar.timezone(), LocationTimezone::Default(_)),
        observations = observations.len(),
        "resolved location inputs"
    );

    Ok(LocationInputs {
        location_id: location_id.to_string(),
        calendar,
        observations,
    })
}

/// Pure estimate for one location at reference instant `now`.
pub fn estimate_uptime(inputs: &LocationInputs, now: DateTime<Utc>) -> UptimeResult {
    if inputs.observations.is_empty() {
        return UptimeResult::zero(&inputs.location_id);
    }

    let timeline = StatusTimeline::reconstruct(&inputs.observations, now);
    let [hour, day, week] = TrailingWindow::ALL
        .map(|window| aggregate_window(window, &timeline, &inputs.calendar, now));
    UptimeResult::from_windows(&inputs.location_id, hour, day, week)
}

pub async fn compute_location_uptime(
    source: &dyn LocationDataSource,
    location_id: &str,
    now: DateTime<Utc>,
    default_tz: Tz,
) -> DataSourceResult<UptimeResult> {
    let inputs = resolve_inputs(source, location_id, now, default_tz).await?;
    Ok(estimate_uptime(&inputs, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::locations::{BusinessHoursRule, InMemoryLocationData, LocationStatus};
    use chrono::{Datelike, Duration, NaiveTime, TimeZone, Weekday};

    const EPS: f64 = 1e-9;

    fn assert_windows_balance(result: &UptimeResult, hour: f64, day: f64, week: f64) {
        assert!((result.uptime_last_hour + result.downtime_last_hour - hour).abs() < EPS);
        assert!((result.uptime_last_day + result.downtime_last_day - day).abs() < EPS);
        assert!((result.uptime_last_week + result.downtime_last_week - week).abs() < EPS);
    }

    #[tokio::test]
    async fn location_without_recent_observations_reports_zero() {
        let data = InMemoryLocationData::new();
        let now = Utc.with_ymd_and_hms(2023, 1, 25, 18, 0, 0).single().expect("now");
        data.push_observation("S9", now - Duration::days(8), LocationStatus::Active);

        let result = compute_location_uptime(&data, "S9", now, DEFAULT_TIMEZONE)
            .await
            .expect("compute");
        assert_eq!(result, UptimeResult::zero("S9"));
    }

    #[tokio::test]
    async fn single_active_observation_with_defaults_is_fully_up() {
        let data = InMemoryLocationData::new();
        let now = Utc.with_ymd_and_hms(2023, 1, 25, 18, 13, 22).single().expect("now");
        data.push_observation("S2", now, LocationStatus::Active);

        let result = compute_location_uptime(&data, "S2", now, DEFAULT_TIMEZONE)
            .await
            .expect("compute");
        assert_eq!(result.uptime_last_hour, 60.0);
        assert_eq!(result.downtime_last_hour, 0.0);
        assert_eq!(result.uptime_last_day, 24.0);
        assert_eq!(result.uptime_last_week, 168.0);
        assert_windows_balance(&result, 60.0, 24.0, 168.0);
    }

    #[tokio::test]
    async fn chicago_weekday_schedule_with_alternating_polls() {
        let data = InMemoryLocationData::new();
        let start = NaiveTime::from_hms_opt(9, 0, 0).expect("start");
        let end = NaiveTime::from_hms_opt(17, 0, 0).expect("end");
        for day in 0..5 {
            data.push_rule(BusinessHoursRule {
                location_id: "S1".to_string(),
                day_of_week: day,
                start_time_local: start,
                end_time_local: end,
            });
        }
        data.set_timezone("S1", "America/Chicago");

        // Monday 2023-01-23 22:00 UTC is 16:00 CST.
        let now = Utc.with_ymd_and_hms(2023, 1, 23, 22, 0, 0).single().expect("now");
        assert_eq!(now.weekday(), Weekday::Mon);
        for step in (0..=48).rev() {
            let status = if step % 2 == 0 {
                LocationStatus::Active
            } else {
                LocationStatus::Inactive
            };
            data.push_observation("S1", now - Duration::minutes(30 * step), status);
        }

        let result = compute_location_uptime(&data, "S1", now, DEFAULT_TIMEZONE)
            .await
            .expect("compute");

        // Last hour: 15:00 (A), 15:30 (I), 16:00 (A) local are all in hours.
        assert!((result.uptime_last_hour - 40.0).abs() < EPS);
        assert!((result.uptime_last_hour + result.downtime_last_hour - 60.0).abs() < EPS);

        // Day checks 16:00 down to 09:00 Monday; Sunday's hours contribute
        // nothing although polls exist then. The week adds Tuesday..Friday
        // and the 17:00 check of the previous Monday.
        assert_windows_balance(&result, 60.0, 8.0, 8.0 + 4.0 * 9.0 + 1.0);
        // Monday 09:00..16:00 local: 15 polls, 8 of them active.
        assert!((result.uptime_last_day - 8.0 * 8.0 / 15.0).abs() < EPS);
    }
}
