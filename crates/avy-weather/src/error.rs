//! Weather-specific error types.

use avy_core::{AppError, NetworkError, ReqwestErrorExt};
use std::fmt;
use thiserror::Error;

/// Top-level parts of the forecast page the normalizer cannot do without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    ZoneTabs,
    SnowLevelTable,
    PrecipitationTable,
    TemperatureTable,
    WindHeading,
    WindContainer,
    WindTable,
    Forecaster,
    Synopsis,
    IssuedDate,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::ZoneTabs => "zone forecast tabs (.forecast-tabs)",
            Section::SnowLevelTable => "snow level table (.desktop.snow-level)",
            Section::PrecipitationTable => "precipitation table (.desktop.precipitation)",
            Section::TemperatureTable => "temperature table (.desktop.temperatures)",
            Section::WindHeading => "ridgeline winds heading (#free-winds-5k)",
            Section::WindContainer => "container following the ridgeline winds heading",
            Section::WindTable => "ridgeline winds table",
            Section::Forecaster => "forecaster byline (.forecaster)",
            Section::Synopsis => "synopsis (.synopsis)",
            Section::IssuedDate => "issued date (.forecast-date)",
        };
        f.write_str(name)
    }
}

/// The forecast page could not be turned into a `ForecastDocument`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing required section: {0}")]
    MissingSection(Section),

    #[error("unrecognized issued date: {0:?}")]
    InvalidIssuedDate(String),

    #[error("unknown timezone abbreviation: {0}")]
    UnknownTimezone(String),
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Forecast parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("No mountain-weather forecast for center {0}")]
    UnsupportedCenter(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::Network(err.into_network_error())
    }
}

impl WeatherError {
    /// User-facing message. A failed fetch or parse never yields partial data.
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::Network(e) => e.user_message(),
            WeatherError::Parse(_) => "Weather data is unavailable right now. Please try again later.",
            WeatherError::UnsupportedCenter(_) => {
                "Mountain weather is only available for the Northwest Avalanche Center."
            }
            WeatherError::Cache(_) => "Weather data may be outdated.",
        }
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::Network(e) => AppError::Network(e),
            other => AppError::Service {
                user_message: other.user_message(),
                detail: other.to_string(),
            },
        }
    }
}
