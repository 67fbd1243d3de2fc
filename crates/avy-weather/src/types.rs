use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::period::PeriodLabel;
use crate::zones::canonical_zone_name;

/// Half of a forecast day a reading applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPart {
    Day,
    Night,
}

/// Early or late portion of a `DayPart`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubPeriod {
    Early,
    Late,
}

/// Snow level reading, in feet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnowLevel {
    pub period: DayPart,
    pub subperiod: SubPeriod,
    pub level: u32,
}

/// Ridgeline wind reading, kept as the published text (e.g. "W 15-25")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindSpeed {
    pub period: DayPart,
    pub subperiod: SubPeriod,
    pub speed: String,
}

/// Temperature range in degrees Fahrenheit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Temperatures {
    pub low: i32,
    pub high: i32,
}

/// One day or night slot of a zone forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPeriod {
    pub label: PeriodLabel,
    pub forecast: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snow_level: Vec<SnowLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperatures: Option<Temperatures>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub winds: Vec<WindSpeed>,
    /// Precipitation amount keyed by precipitation sub-zone
    #[serde(default)]
    pub precipitation: BTreeMap<String, String>,
}

impl ForecastPeriod {
    pub fn new(label: PeriodLabel, forecast: impl Into<String>) -> Self {
        Self {
            label,
            forecast: forecast.into(),
            snow_level: Vec::new(),
            temperatures: None,
            winds: Vec::new(),
            precipitation: BTreeMap::new(),
        }
    }
}

/// Complete mountain-weather forecast for every zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDocument {
    pub author: String,
    pub published_time: DateTime<FixedOffset>,
    pub expires_time: DateTime<FixedOffset>,
    pub synopsis: Option<String>,
    /// Forecast periods keyed by canonical zone name
    pub zones: BTreeMap<String, Vec<ForecastPeriod>>,
}

impl ForecastDocument {
    /// Look up a zone by raw or canonical name
    pub fn zone(&self, name: &str) -> Option<&[ForecastPeriod]> {
        self.zones
            .get(canonical_zone_name(name))
            .map(Vec::as_slice)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_time
    }
}
