use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;

use super::schedule::Schedule;
use super::timezone::LocationTimezone;

/// A location's schedule bound to its civil timezone, answering whether an
/// absolute instant falls inside business hours.
#[derive(Debug, Clone)]
pub struct BusinessCalendar {
    schedule: Schedule,
    timezone: LocationTimezone,
}

impl BusinessCalendar {
    pub fn new(schedule: Schedule, timezone: LocationTimezone) -> Self {
        Self { schedule, timezone }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn timezone(&self) -> LocationTimezone {
        self.timezone
    }

    pub fn tz(&self) -> Tz {
        self.timezone.tz()
    }

    pub fn is_open(&self, instant: DateTime<Utc>) -> bool {
        let local = instant.with_timezone(&self.tz());
        let day_of_week = local.weekday().num_days_from_monday() as u8;
        self.schedule.contains(day_of_week, local.time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::locations::BusinessHoursRule;
    use chrono::{NaiveTime, TimeZone};

    fn weekday_nine_to_five() -> Schedule {
        let start = NaiveTime::from_hms_opt(9, 0, 0).expect("start");
        let end = NaiveTime::from_hms_opt(17, 0, 0).expect("end");
        Schedule::resolve(
            (0..5)
                .map(|day| BusinessHoursRule {
                    location_id: "S1".to_string(),
                    day_of_week: day,
                    start_time_local: start,
                    end_time_local: end,
                })
                .collect(),
        )
    }

    #[test]
    fn converts_to_local_time_before_testing_membership() {
        let calendar = BusinessCalendar::new(
            weekday_nine_to_five(),
            LocationTimezone::Recorded(chrono_tz::America::Chicago),
        );
        // Tuesday 2023-01-24 15:00 UTC is 09:00 CST.
        let opening = Utc.with_ymd_and_hms(2023, 1, 24, 15, 0, 0).single().expect("ts");
        assert!(calendar.is_open(opening));
        assert!(!calendar.is_open(opening - chrono::Duration::seconds(1)));
        // 23:00 UTC is 17:00 CST, the inclusive closing bound.
        let closing = Utc.with_ymd_and_hms(2023, 1, 24, 23, 0, 0).single().expect("ts");
        assert!(calendar.is_open(closing));
        assert!(!calendar.is_open(closing + chrono::Duration::minutes(1)));
    }

    #[test]
    fn local_weekday_decides_the_rule_set() {
        let calendar = BusinessCalendar::new(
            weekday_nine_to_five(),
            LocationTimezone::Recorded(chrono_tz::Asia::Tokyo),
        );
        // Friday 2023-01-27 23:30 UTC is Saturday 08:30 in Tokyo.
        let saturday_local = Utc.with_ymd_and_hms(2023, 1, 27, 23, 30, 0).single().expect("ts");
        assert!(!calendar.is_open(saturday_local));
        // Friday 2023-01-27 01:00 UTC is Friday 10:00 in Tokyo.
        let friday_local = Utc.with_ymd_and_hms(2023, 1, 27, 1, 0, 0).single().expect("ts");
        assert!(calendar.is_open(friday_local));
    }

    #[test]
    fn tracks_daylight_saving_offsets() {
        let calendar = BusinessCalendar::new(
            weekday_nine_to_five(),
            LocationTimezone::Recorded(chrono_tz::America::New_York),
        );
        // Monday 2023-07-10 13:00 UTC is 09:00 EDT; in winter 13:00 UTC is 08:00 EST.
        let summer = Utc.with_ymd_and_hms(2023, 7, 10, 13, 0, 0).single().expect("ts");
        let winter = Utc.with_ymd_and_hms(2023, 1, 9, 13, 0, 0).single().expect("ts");
        assert!(calendar.is_open(summer));
        assert!(!calendar.is_open(winter));
    }
}
