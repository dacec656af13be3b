//! Date and time parsing for hand-typed and spreadsheet-exported values.
//!
//! Every parser is total: unreadable input yields `None` (or the offending
//! field), never a panic or an error that would abort a run.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::RowField;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d.%m.%Y"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%H:%M:%S%.f", "%I:%M %p", "%I:%M:%S %p"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Largest serial day a spreadsheet can hold (9999-12-31).
const MAX_SERIAL_DAY: f64 = 2_958_465.0;

const SECONDS_PER_DAY: f64 = 86_400.0;
const LAST_SECOND_OF_DAY: u32 = 86_399;

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| parse_datetime(raw).map(|value| value.date()))
        .or_else(|| parse_serial_date(raw))
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
        .or_else(|| parse_datetime(raw).map(|value| value.time()))
        .or_else(|| parse_day_fraction(raw))
}

/// Combines a raw date and time into the entry timestamp of a row.
pub fn normalize_timestamp(raw_date: &str, raw_time: &str) -> Result<NaiveDateTime, RowField> {
    let date = parse_date(raw_date).ok_or(RowField::Date)?;
    let time = parse_time(raw_time).ok_or(RowField::Time)?;
    Ok(date.and_time(time))
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

// Serial day numbers count from 1899-12-30.
fn parse_serial_date(raw: &str) -> Option<NaiveDate> {
    let serial: f64 = raw.parse().ok()?;
    if !serial.is_finite() || serial < 1.0 || serial > MAX_SERIAL_DAY {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

// A bare fraction is a time cell; a serial with a written fractional part is
// a full datetime cell, whose time of day is the fraction.
fn parse_day_fraction(raw: &str) -> Option<NaiveTime> {
    let value: f64 = raw.parse().ok()?;
    if !value.is_finite() || value < 0.0 || value >= MAX_SERIAL_DAY + 1.0 {
        return None;
    }
    if value >= 1.0 && !raw.contains('.') {
        return None;
    }
    let seconds = ((value.fract() * SECONDS_PER_DAY).round() as u32).min(LAST_SECOND_OF_DAY);
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
}
