use chrono::{NaiveTime, Timelike};

use crate::services::locations::BusinessHoursRule;

/// Weekly operating hours for one location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// No rules recorded: open every day, 00:00:00 through 23:59:59.
    Default,
    Recorded(Vec<BusinessHoursRule>),
}

impl Schedule {
    pub fn resolve(rules: Vec<BusinessHoursRule>) -> Self {
        if rules.is_empty() {
            Schedule::Default
        } else {
            Schedule::Recorded(rules)
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Schedule::Default)
    }

    /// Point-in-time membership on a local weekday (Monday = 0). Both bounds
    /// are inclusive and compared at whole-second resolution.
    pub fn contains(&self, day_of_week: u8, local_time: NaiveTime) -> bool {
        let local_time = truncate_to_second(local_time);
        match self {
            Schedule::Default => day_of_week <= 6,
            Schedule::Recorded(rules) => rules.iter().any(|rule| {
                rule.day_of_week == day_of_week
                    && rule.start_time_local <= local_time
                    && local_time <= rule.end_time_local
            }),
        }
    }
}

fn truncate_to_second(time: NaiveTime) -> NaiveTime {
    time.with_nanosecond(0).unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).expect("time")
    }

    fn rule(day: u8, start: NaiveTime, end: NaiveTime) -> BusinessHoursRule {
        BusinessHoursRule {
            location_id: "S1".to_string(),
            day_of_week: day,
            start_time_local: start,
            end_time_local: end,
        }
    }

    #[test]
    fn empty_rule_set_resolves_to_default_schedule() {
        let schedule = Schedule::resolve(Vec::new());
        assert!(schedule.is_default());
        assert!(schedule.contains(6, hms(23, 59, 59)));
        let late = hms(23, 59, 59)
            .with_nanosecond(900_000_000)
            .expect("fractional");
        assert!(schedule.contains(3, late));
    }

    #[test]
    fn recorded_bounds_are_inclusive() {
        let schedule = Schedule::resolve(vec![rule(0, hms(9, 0, 0), hms(17, 0, 0))]);
        assert!(schedule.contains(0, hms(9, 0, 0)));
        assert!(schedule.contains(0, hms(17, 0, 0)));
        assert!(!schedule.contains(0, hms(8, 59, 59)));
        assert!(!schedule.contains(0, hms(17, 0, 1)));
        assert!(!schedule.contains(1, hms(12, 0, 0)));
    }

    #[test]
    fn any_rule_on_the_day_admits_the_instant() {
        let schedule = Schedule::resolve(vec![
            rule(2, hms(8, 0, 0), hms(11, 0, 0)),
            rule(2, hms(14, 0, 0), hms(20, 0, 0)),
        ]);
        assert!(schedule.contains(2, hms(10, 0, 0)));
        assert!(!schedule.contains(2, hms(12, 0, 0)));
        assert!(schedule.contains(2, hms(15, 30, 0)));
    }

    #[test]
    fn overnight_rule_never_matches() {
        let schedule = Schedule::resolve(vec![rule(4, hms(22, 0, 0), hms(2, 0, 0))]);
        assert!(!schedule.contains(4, hms(23, 0, 0)));
        assert!(!schedule.contains(4, hms(1, 0, 0)));
    }
}
