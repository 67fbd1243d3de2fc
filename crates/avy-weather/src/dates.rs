//! Issued/expiry time handling for the forecast page.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Timelike};
use regex::Regex;
use std::fmt::Display;
use std::sync::LazyLock;

use crate::error::ParseError;

// "Issued: 2:00 PM PST Wednesday, January 25, 2023"
#[allow(clippy::expect_used)]
static ISSUED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Issued:\s*(\d{1,2}:\d{2})\s*([AaPp][Mm])\s+([A-Za-z]{1,5})\s+[A-Za-z]+,?\s+([A-Za-z]+)\s+(\d{1,2}),?\s+(\d{4})",
    )
    .expect("literal pattern")
});

/// Hours before a morning forecast expires (same day) and an afternoon one (next day)
const MORNING_EXPIRY_HOUR: u32 = 14;
const AFTERNOON_EXPIRY_HOUR: u32 = 7;

/// UTC offset for a North American timezone abbreviation
pub fn timezone_offset(abbreviation: &str) -> Option<FixedOffset> {
    let hours = match abbreviation.to_ascii_uppercase().as_str() {
        "UTC" | "GMT" | "Z" => 0,
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" | "AKDT" => -8,
        "AKST" => -9,
        "HST" => -10,
        _ => return None,
    };
    FixedOffset::east_opt(hours * 3600)
}

/// Parse the page's "Issued: ..." line into a time carrying the page's offset
pub fn parse_issued(text: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    let invalid = || ParseError::InvalidIssuedDate(text.to_string());

    let caps = ISSUED.captures(text).ok_or_else(invalid)?;

    let time = NaiveTime::parse_from_str(
        &format!("{} {}", &caps[1], caps[2].to_ascii_uppercase()),
        "%I:%M %p",
    )
    .map_err(|_| invalid())?;
    let date = NaiveDate::parse_from_str(
        &format!("{} {} {}", &caps[4], &caps[5], &caps[6]),
        "%B %d %Y",
    )
    .map_err(|_| invalid())?;
    let offset = timezone_offset(&caps[3])
        .ok_or_else(|| ParseError::UnknownTimezone(caps[3].to_string()))?;

    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(invalid)
}

/// Expiry of a forecast published at `published`.
///
/// Forecasts issued before local noon expire at 14:00 the same local day;
/// later ones expire at 07:00 the next local day.
pub fn infer_expiry(published: DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>, ParseError> {
    let offset = *published.offset();
    let local_date = published.date_naive();

    let (date, hour) = if published.hour() < 12 {
        (Some(local_date), MORNING_EXPIRY_HOUR)
    } else {
        (local_date.succ_opt(), AFTERNOON_EXPIRY_HOUR)
    };

    date.and_then(|d| d.and_hms_opt(hour, 0, 0))
        .and_then(|dt| offset.from_local_datetime(&dt).single())
        .ok_or_else(|| ParseError::InvalidIssuedDate(published.to_rfc3339()))
}

/// Render a timestamp as "Wed, Jan 25, 2023 2:00 PM"
pub fn format_timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    time.format("%a, %b %-d, %Y %-I:%M %p").to_string()
}

/// Render an RFC 3339 timestamp in the local timezone, or "Unknown"
pub fn utc_to_local_time_string(date: Option<&str>) -> String {
    match date.and_then(|s| DateTime::parse_from_rfc3339(s).ok()) {
        Some(time) => format_timestamp(&time.with_timezone(&Local)),
        None => "Unknown".to_string(),
    }
}
