//! Synopsis product types and query keys.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How long a fetched synopsis stays usable
pub const CACHE_TIME: Duration = Duration::from_secs(12 * 60 * 60);

/// Date format the product API accepts for `published_time`
const API_DATE_FORMAT: &str = "%Y-%m-%d";

/// Which synopsis to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestedTime {
    Latest,
    /// Synopsis published on the given day
    Archived(NaiveDate),
}

impl RequestedTime {
    fn prefix(&self) -> &'static str {
        match self {
            RequestedTime::Latest => "latest",
            RequestedTime::Archived(_) => "archived",
        }
    }

    /// The requested day; `today` for the latest synopsis
    pub fn date_on(&self, today: NaiveDate) -> NaiveDate {
        match self {
            RequestedTime::Latest => today,
            RequestedTime::Archived(date) => *date,
        }
    }
}

/// `yyyy-MM-dd`, as the product API expects dates
pub fn api_date_string(date: NaiveDate) -> String {
    date.format(API_DATE_FORMAT).to_string()
}

/// Identity of one synopsis request, used as its cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryKey {
    pub name: String,
    pub host: String,
    pub center: String,
    pub zone_id: u32,
    pub requested_time: String,
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}/{} @ {}",
            self.name, self.host, self.center, self.zone_id, self.requested_time
        )
    }
}

/// Cache key for a synopsis request made today
pub fn query_key(host: &str, center_id: &str, zone_id: u32, requested: RequestedTime) -> QueryKey {
    query_key_on(host, center_id, zone_id, requested, Local::now().date_naive())
}

/// Cache key for a synopsis request made on `today`
pub fn query_key_on(
    host: &str,
    center_id: &str,
    zone_id: u32,
    requested: RequestedTime,
    today: NaiveDate,
) -> QueryKey {
    QueryKey {
        name: format!("{}-synopsis", requested.prefix()),
        host: host.to_string(),
        center: center_id.to_string(),
        zone_id,
        requested_time: api_date_string(requested.date_on(today)),
    }
}

/// Center summary embedded in a product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvalancheCenterInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// Forecast zone a product covers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastZoneRef {
    pub id: Option<u32>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub state: Option<String>,
    pub zone_id: Option<String>,
}

/// Regional synopsis product. Every field may be missing from the response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Synopsis {
    pub id: Option<u64>,
    pub product_type: Option<String>,
    pub status: Option<String>,
    pub author: Option<String>,
    pub published_time: Option<String>,
    pub expires_time: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub announcement: Option<String>,
    pub bottom_line: Option<String>,
    pub hazard_discussion: Option<String>,
    pub weather_discussion: Option<String>,
    pub avalanche_center: Option<AvalancheCenterInfo>,
    pub forecast_zone: Option<Vec<ForecastZoneRef>>,
    /// Zone the synopsis was requested for
    pub zone_id: Option<u32>,
}
