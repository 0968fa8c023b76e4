use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::business_hours::BusinessCalendar;
use super::timeline::StatusTimeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingWindow {
    LastHour,
    LastDay,
    LastWeek,
}

impl TrailingWindow {
    pub const ALL: [TrailingWindow; 3] = [
        TrailingWindow::LastHour,
        TrailingWindow::LastDay,
        TrailingWindow::LastWeek,
    ];

    pub fn span(&self) -> Duration {
        match self {
            TrailingWindow::LastHour => Duration::hours(1),
            TrailingWindow::LastDay => Duration::days(1),
            TrailingWindow::LastWeek => Duration::days(7),
        }
    }

    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.span()
    }

    /// Business duration in the window's unit: minutes for the hour window,
    /// hours for the day and week windows. The hour window counts as one
    /// 60-minute block; the others sample each hour boundary back from `now`.
    pub fn business_duration(&self, calendar: &BusinessCalendar, now: DateTime<Utc>) -> f64 {
        match self {
            TrailingWindow::LastHour => 60.0,
            TrailingWindow::LastDay | TrailingWindow::LastWeek => {
                let steps = self.span().num_hours();
                (0..steps)
                    .filter(|step| calendar.is_open(now - Duration::hours(*step)))
                    .count() as f64
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowMetrics {
    pub uptime: f64,
    pub downtime: f64,
    pub in_hours_observations: usize,
}

/// Uptime and downtime of one trailing window. Only observations anchored in
/// the window and inside business hours contribute to the active ratio; a
/// window without such observations reports zero for both.
pub fn aggregate_window(
    window: TrailingWindow,
    timeline: &StatusTimeline,
    calendar: &BusinessCalendar,
    now: DateTime<Utc>,
) -> WindowMetrics {
    let mut total = 0usize;
    let mut active = 0usize;
    for interval in timeline.anchored_within(window.start(now), now) {
        if !calendar.is_open(interval.start) {
            continue;
        }
        total += 1;
        if interval.status.is_active() {
            active += 1;
        }
    }

    if total == 0 {
        return WindowMetrics::default();
    }

    let active_ratio = active as f64 / total as f64;
    let business_duration = window.business_duration(calendar, now);
    let uptime = active_ratio * business_duration;
    WindowMetrics {
        uptime,
        downtime: business_duration - uptime,
        in_hours_observations: total,
    }
}

/// One output row: hour fields in minutes, day and week fields in hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UptimeResult {
    pub location_id: String,
    pub uptime_last_hour: f64,
    pub uptime_last_day: f64,
    pub uptime_last_week: f64,
    pub downtime_last_hour: f64,
    pub downtime_last_day: f64,
    pub downtime_last_week: f64,
}

impl UptimeResult {
    pub fn zero(location_id: &str) -> Self {
        Self {
            location_id: location_id.to_string(),
            uptime_last_hour: 0.0,
            uptime_last_day: 0.0,
            uptime_last_week: 0.0,
            downtime_last_hour: 0.0,
            downtime_last_day: 0.0,
            downtime_last_week: 0.0,
        }
    }

    pub fn from_windows(
        location_id: &str,
        hour: WindowMetrics,
        day: WindowMetrics,
        week: WindowMetrics,
    ) -> Self {
        Self {
            location_id: location_id.to_string(),
            uptime_last_hour: hour.uptime,
            uptime_last_day: day.uptime,
            uptime_last_week: week.uptime,
            downtime_last_hour: hour.downtime,
            downtime_last_day: day.downtime,
            downtime_last_week: week.downtime,
        }
    }
}
