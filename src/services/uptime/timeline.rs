use chrono::{DateTime, Utc};

use crate::services::locations::{LocationStatus, StatusObservation};

/// A span over which one observed status holds: from its observation until
/// the next observation (or the end of the range).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: LocationStatus,
}

/// Step-function view of a location's observations inside a bounded range.
/// The status at `t` is the status of the latest observation at or before
/// `t`; instants before the first observation have no status.
#[derive(Debug, Clone, Default)]
pub struct StatusTimeline {
    intervals: Vec<StatusInterval>,
}

impl StatusTimeline {
    /// `observations` must be sorted ascending by timestamp and lie within
    /// `[.., range_end]`. One interval is emitted per observation; ties keep
    /// source order, so the later write wins from that instant on.
    pub fn reconstruct(observations: &[StatusObservation], range_end: DateTime<Utc>) -> Self {
        let intervals = observations
            .iter()
            .enumerate()
            .map(|(idx, obs)| {
                let end = observations
                    .get(idx + 1)
                    .map(|next| next.timestamp_utc)
                    .unwrap_or(range_end)
                    .max(obs.timestamp_utc);
                StatusInterval {
                    start: obs.timestamp_utc,
                    end,
                    status: obs.status,
                }
            })
            .collect();
        Self { intervals }
    }

    pub fn intervals(&self) -> &[StatusInterval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn status_at(&self, instant: DateTime<Utc>) -> Option<LocationStatus> {
        let idx = self
            .intervals
            .partition_point(|interval| interval.start <= instant);
        idx.checked_sub(1).map(|idx| self.intervals[idx].status)
    }

    /// Intervals whose anchoring observation falls in `[start, end]`.
    pub fn anchored_within(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = &StatusInterval> {
        self.intervals
            .iter()
            .filter(move |interval| interval.start >= start && interval.start <= end)
    }
}
