use chrono_tz::Tz;

use crate::services::locations::TimezoneRecord;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Chicago;

/// Civil timezone for one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationTimezone {
    Default(Tz),
    Recorded(Tz),
}

impl LocationTimezone {
    /// Never fails: a missing record, or a name the zone database does not
    /// know, yields the default zone.
    pub fn resolve(record: Option<&TimezoneRecord>, default: Tz) -> Self {
        let Some(record) = record else {
            return LocationTimezone::Default(default);
        };
        match record.timezone_str.trim().parse::<Tz>() {
            Ok(tz) => LocationTimezone::Recorded(tz),
            Err(err) => {
                tracing::warn!(
                    location_id = %record.location_id,
                    timezone = %record.timezone_str,
                    error = %err,
                    fallback = %default.name(),
                    "unknown timezone; using default"
                );
                LocationTimezone::Default(default)
            }
        }
    }

    pub fn tz(&self) -> Tz {
        match self {
            LocationTimezone::Default(tz) | LocationTimezone::Recorded(tz) => *tz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> TimezoneRecord {
        TimezoneRecord {
            location_id: "S1".to_string(),
            timezone_str: name.to_string(),
        }
    }

    #[test]
    fn missing_record_uses_default_zone() {
        let resolved = LocationTimezone::resolve(None, DEFAULT_TIMEZONE);
        assert_eq!(resolved, LocationTimezone::Default(chrono_tz::America::Chicago));
    }

    #[test]
    fn recorded_zone_is_parsed() {
        let resolved = LocationTimezone::resolve(Some(&record("Asia/Kolkata")), DEFAULT_TIMEZONE);
        assert_eq!(resolved, LocationTimezone::Recorded(chrono_tz::Asia::Kolkata));
    }

    #[test]
    fn unknown_zone_falls_back_to_default() {
        let resolved =
            LocationTimezone::resolve(Some(&record("Mars/Olympus_Mons")), chrono_tz::UTC);
        assert_eq!(resolved.tz(), chrono_tz::UTC);
        assert!(matches!(resolved, LocationTimezone::Default(_)));
    }
}
