//! Forecast period labels and header inference.

use chrono::Weekday;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::types::{DayPart, SubPeriod};

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

/// Full English day name to weekday. Abbreviations are not accepted.
pub fn parse_weekday(name: &str) -> Option<Weekday> {
    WEEKDAYS.into_iter().find(|d| weekday_name(*d) == name)
}

/// One of the fourteen forecast slot names, "Sunday" .. "Saturday Night"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeriodLabel {
    day: Weekday,
    night: bool,
}

impl PeriodLabel {
    pub fn day(day: Weekday) -> Self {
        Self { day, night: false }
    }

    pub fn night(day: Weekday) -> Self {
        Self { day, night: true }
    }
}

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.night {
            write!(f, "{} Night", weekday_name(self.day))
        } else {
            f.write_str(weekday_name(self.day))
        }
    }
}

impl FromStr for PeriodLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let day = parts
            .next()
            .and_then(parse_weekday)
            .ok_or_else(|| format!("not a period label: {s:?}"))?;
        match (parts.next(), parts.next()) {
            (None, _) => Ok(Self::day(day)),
            (Some("Night"), None) => Ok(Self::night(day)),
            _ => Err(format!("not a period label: {s:?}")),
        }
    }
}

impl Serialize for PeriodLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PeriodLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// What a table column header says about the slot it covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodInfo {
    /// Forecast period the column belongs to
    pub label: PeriodLabel,
    pub day: Weekday,
    pub period: DayPart,
    pub subperiod: SubPeriod,
}

/// Infer the forecast period of a column header such as "Monday Evening".
///
/// Morning and afternoon columns belong to the day period, evening and night
/// columns to the night period. Returns `None` for anything else so callers
/// can filter unknown headers out.
pub fn period_info(input: &str) -> Option<PeriodInfo> {
    let mut parts = input.split(' ');
    let day = parse_weekday(parts.next()?)?;

    let (label, period, subperiod) = match parts.next() {
        None | Some("Afternoon") => (PeriodLabel::day(day), DayPart::Day, SubPeriod::Late),
        Some("Morning") => (PeriodLabel::day(day), DayPart::Day, SubPeriod::Early),
        Some("Evening") => (PeriodLabel::night(day), DayPart::Night, SubPeriod::Early),
        Some("Night") => (PeriodLabel::night(day), DayPart::Night, SubPeriod::Late),
        Some(_) => return None,
    };

    Some(PeriodInfo {
        label,
        day,
        period,
        subperiod,
    })
}
