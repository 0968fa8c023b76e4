//! Loads the raw CSV exports (status polls, business hours, timezones) into
//! Postgres. Rows that cannot be parsed are skipped and logged; a bad record
//! never aborts the load.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::io::Read;
use std::path::Path;

use super::{BusinessHoursRule, LocationStatus, StatusObservation, TimezoneRecord};

pub const STATUS_FILE: &str = "store_status.csv";
pub const BUSINESS_HOURS_FILE: &str = "menu_hours.csv";
pub const TIMEZONES_FILE: &str = "timezones.csv";

const INSERT_CHUNK_ROWS: usize = 1_000;

#[derive(Debug, Clone)]
pub struct ParsedFile<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped: usize,
    pub already_present: bool,
}

#[derive(Debug, Deserialize)]
struct RawStatusRow {
    #[serde(alias = "store_id")]
    location_id: String,
    status: String,
    timestamp_utc: String,
}

#[derive(Debug, Deserialize)]
struct RawBusinessHoursRow {
    #[serde(alias = "store_id")]
    location_id: String,
    #[serde(alias = "day", alias = "dayOfWeek")]
    day_of_week: String,
    start_time_local: String,
    end_time_local: String,
}

#[derive(Debug, Deserialize)]
struct RawTimezoneRow {
    #[serde(alias = "store_id")]
    location_id: String,
    timezone_str: String,
}

pub fn parse_timestamp_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = raw.strip_suffix("UTC").map(str::trim_end).unwrap_or(raw);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|value| value.and_utc())
}

fn parse_local_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S").ok()
}

fn non_empty_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn parse_status_csv<R: Read>(reader: R) -> ParsedFile<StatusObservation> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    let mut skipped = 0;

    for (idx, row) in csv_reader.deserialize::<RawStatusRow>().enumerate() {
        let line = idx + 2;
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!(file = STATUS_FILE, line, error = %err, "skipping malformed row");
                skipped += 1;
                continue;
            }
        };
        let Some(location_id) = non_empty_id(&row.location_id) else {
            tracing::warn!(file = STATUS_FILE, line, "skipping row without location id");
            skipped += 1;
            continue;
        };
        let status = match row.status.parse::<LocationStatus>() {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(file = STATUS_FILE, line, %location_id, error = %err, "skipping row with unknown status");
                skipped += 1;
                continue;
            }
        };
        let Some(timestamp_utc) = parse_timestamp_utc(&row.timestamp_utc) else {
            tracing::warn!(
                file = STATUS_FILE,
                line,
                %location_id,
                timestamp = %row.timestamp_utc,
                "skipping row with unparseable timestamp"
            );
            skipped += 1;
            continue;
        };
        records.push(StatusObservation {
            location_id,
            timestamp_utc,
            status,
        });
    }

    ParsedFile { records, skipped }
}

pub fn parse_business_hours_csv<R: Read>(reader: R) -> ParsedFile<BusinessHoursRule> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    let mut skipped = 0;

    for (idx, row) in csv_reader.deserialize::<RawBusinessHoursRow>().enumerate() {
        let line = idx + 2;
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!(file = BUSINESS_HOURS_FILE, line, error = %err, "skipping malformed row");
                skipped += 1;
                continue;
            }
        };
        let Some(location_id) = non_empty_id(&row.location_id) else {
            tracing::warn!(file = BUSINESS_HOURS_FILE, line, "skipping row without location id");
            skipped += 1;
            continue;
        };
        let Some(day_of_week) = row
            .day_of_week
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|day| *day <= 6)
        else {
            tracing::warn!(
                file = BUSINESS_HOURS_FILE,
                line,
                %location_id,
                day = %row.day_of_week,
                "skipping row with invalid day of week"
            );
            skipped += 1;
            continue;
        };
        let (Some(start_time_local), Some(end_time_local)) = (
            parse_local_time(&row.start_time_local),
            parse_local_time(&row.end_time_local),
        ) else {
            tracing::warn!(
                file = BUSINESS_HOURS_FILE,
                line,
                %location_id,
                day_of_week,
                "skipping row with invalid time format"
            );
            skipped += 1;
            continue;
        };
        if start_time_local > end_time_local {
            // Kept as recorded; same-day rules that wrap midnight never match.
            tracing::warn!(
                file = BUSINESS_HOURS_FILE,
                line,
                %location_id,
                day_of_week,
                start = %start_time_local,
                end = %end_time_local,
                "business hours rule ends before it starts"
            );
        }
        records.push(BusinessHoursRule {
            location_id,
            day_of_week,
            start_time_local,
            end_time_local,
        });
    }

    ParsedFile { records, skipped }
}

pub fn parse_timezones_csv<R: Read>(reader: R) -> ParsedFile<TimezoneRecord> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    let mut skipped = 0;

    for (idx, row) in csv_reader.deserialize::<RawTimezoneRow>().enumerate() {
        let line = idx + 2;
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!(file = TIMEZONES_FILE, line, error = %err, "skipping malformed row");
                skipped += 1;
                continue;
            }
        };
        let (Some(location_id), Some(timezone_str)) =
            (non_empty_id(&row.location_id), non_empty_id(&row.timezone_str))
        else {
            tracing::warn!(file = TIMEZONES_FILE, line, "skipping row with empty fields");
            skipped += 1;
            continue;
        };
        records.push(TimezoneRecord {
            location_id,
            timezone_str,
        });
    }

    ParsedFile { records, skipped }
}

async fn table_has_rows(db: &PgPool, table: &str) -> Result<bool> {
    let row: (bool,) = sqlx::query_as(&format!("SELECT EXISTS (SELECT 1 FROM {table})"))
        .fetch_one(db)
        .await
        .with_context(|| format!("failed to inspect {table}"))?;
    Ok(row.0)
}

fn open_csv(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))
}

pub async fn load_status(db: &PgPool, path: &Path) -> Result<LoadSummary> {
    if table_has_rows(db, "location_status").await? {
        return Ok(LoadSummary {
            already_present: true,
            ..LoadSummary::default()
        });
    }
    let parsed = parse_status_csv(open_csv(path)?);
    for chunk in parsed.records.chunks(INSERT_CHUNK_ROWS) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO location_status (location_id, timestamp_utc, status) ",
        );
        qb.push_values(chunk, |mut row, obs| {
            row.push_bind(&obs.location_id)
                .push_bind(obs.timestamp_utc)
                .push_bind(obs.status.as_str());
        });
        qb.build()
            .execute(db)
            .await
            .context("failed to insert status observations")?;
    }
    Ok(LoadSummary {
        loaded: parsed.records.len(),
        skipped: parsed.skipped,
        already_present: false,
    })
}

pub async fn load_business_hours(db: &PgPool, path: &Path) -> Result<LoadSummary> {
    if table_has_rows(db, "business_hours").await? {
        return Ok(LoadSummary {
            already_present: true,
            ..LoadSummary::default()
        });
    }
    let parsed = parse_business_hours_csv(open_csv(path)?);
    for chunk in parsed.records.chunks(INSERT_CHUNK_ROWS) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO business_hours (location_id, day_of_week, start_time_local, end_time_local) ",
        );
        qb.push_values(chunk, |mut row, rule| {
            row.push_bind(&rule.location_id)
                .push_bind(i16::from(rule.day_of_week))
                .push_bind(rule.start_time_local)
                .push_bind(rule.end_time_local);
        });
        qb.build()
            .execute(db)
            .await
            .context("failed to insert business hours")?;
    }
    Ok(LoadSummary {
        loaded: parsed.records.len(),
        skipped: parsed.skipped,
        already_present: false,
    })
}

pub async fn load_timezones(db: &PgPool, path: &Path) -> Result<LoadSummary> {
    if table_has_rows(db, "location_timezones").await? {
        return Ok(LoadSummary {
            already_present: true,
            ..LoadSummary::default()
        });
    }
    let parsed = parse_timezones_csv(open_csv(path)?);
    let mut loaded = 0;
    for chunk in parsed.records.chunks(INSERT_CHUNK_ROWS) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO location_timezones (location_id, timezone_str) ",
        );
        qb.push_values(chunk, |mut row, record| {
            row.push_bind(&record.location_id)
                .push_bind(&record.timezone_str);
        });
        qb.push(" ON CONFLICT (location_id) DO NOTHING");
        let result = qb
            .build()
            .execute(db)
            .await
            .context("failed to insert timezones")?;
        loaded += result.rows_affected() as usize;
    }
    Ok(LoadSummary {
        loaded,
        skipped: parsed.skipped + (parsed.records.len() - loaded),
        already_present: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_source_timestamp_formats() {
        let expected = Utc
            .with_ymd_and_hms(2023, 1, 22, 12, 9, 39)
            .single()
            .expect("ts");
        let parsed = parse_timestamp_utc("2023-01-22 12:09:39.388884 UTC").expect("utc suffix");
        assert_eq!(parsed.timestamp(), expected.timestamp());
        assert_eq!(parse_timestamp_utc("2023-01-22 12:09:39"), Some(expected));
        assert_eq!(parse_timestamp_utc("2023-01-22T06:09:39-06:00"), Some(expected));
        assert_eq!(parse_timestamp_utc("yesterday"), None);
    }

    #[test]
    fn status_rows_with_bad_fields_are_skipped() {
        let csv = "store_id,status,timestamp_utc\n\
                   S1,active,2023-01-22 12:09:39.388884 UTC\n\
                   S1,sleeping,2023-01-22 12:10:00 UTC\n\
                   S1,inactive,not-a-time\n\
                   ,active,2023-01-22 12:11:00 UTC\n\
                   S2,inactive,2023-01-22 13:00:00 UTC\n";
        let parsed = parse_status_csv(csv.as_bytes());
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.skipped, 3);
        assert_eq!(parsed.records[1].location_id, "S2");
        assert_eq!(parsed.records[1].status, LocationStatus::Inactive);
    }

    #[test]
    fn business_hours_accept_day_column_alias_and_skip_invalid_times() {
        let csv = "store_id,day,start_time_local,end_time_local\n\
                   S1,0,09:00:00,17:00:00\n\
                   S1,7,09:00:00,17:00:00\n\
                   S1,1,9am,17:00:00\n\
                   S1,2,22:00:00,02:00:00\n";
        let parsed = parse_business_hours_csv(csv.as_bytes());
        assert_eq!(parsed.skipped, 2);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].day_of_week, 0);
        assert_eq!(
            parsed.records[0].end_time_local,
            NaiveTime::from_hms_opt(17, 0, 0).expect("time")
        );
        assert_eq!(parsed.records[1].day_of_week, 2);
    }

    #[test]
    fn timezone_rows_require_both_fields() {
        let csv = "store_id,timezone_str\nS1,America/Denver\nS2,\n";
        let parsed = parse_timezones_csv(csv.as_bytes());
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.records[0].timezone_str, "America/Denver");
    }
}
