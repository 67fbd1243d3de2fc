//! Mountain-weather forecasts for avy
//!
//! Fetches the Northwest Avalanche Center's mountain-weather forecast page,
//! normalizes it into per-zone forecast periods and caches the result.

pub mod cache;
pub mod dates;
pub mod dom;
pub mod error;
pub mod normalizer;
pub mod period;
pub mod provider;
pub mod repair;
pub mod types;
pub mod zones;

pub use cache::WeatherCache;
pub use dates::utc_to_local_time_string;
pub use error::{ParseError, Section, WeatherError};
pub use normalizer::{
    attach_to_period, parse_forecast_document, parse_forecast_document_with_report,
    AttachOutcome, ParseReport, PassReport,
};
pub use period::{period_info, PeriodInfo, PeriodLabel};
pub use provider::WeatherProvider;
pub use types::*;
pub use zones::{canonical_zone_name, forecast_zone_for_precipitation};
