//! Fetches the mountain-weather forecast page and normalizes it.

use avy_core::{with_retry, NetworkError, RetryConfig, WeatherConfig};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::cache::WeatherCache;
use crate::error::WeatherError;
use crate::normalizer::{parse_forecast_document_with_report, ParseReport};
use crate::types::ForecastDocument;

/// The only avalanche center that publishes a mountain-weather forecast
pub const SUPPORTED_CENTER: &str = "NWAC";

const USER_AGENT: &str = concat!("avy/", env!("CARGO_PKG_VERSION"));

/// Reject centers without a mountain-weather forecast
pub fn check_center(center_id: &str) -> Result<(), WeatherError> {
    if center_id == SUPPORTED_CENTER {
        Ok(())
    } else {
        Err(WeatherError::UnsupportedCenter(center_id.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    forecast_url: String,
    retry: RetryConfig,
}

impl WeatherProvider {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            forecast_url: config.forecast_url.clone(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Raw forecast page markup
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_html(&self) -> Result<String, WeatherError> {
        let response = with_retry(&self.retry, || self.client.get(&self.forecast_url).send()).await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        Ok(response.text().await?)
    }

    /// Fetch and normalize the current forecast
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_latest(&self) -> Result<ForecastDocument, WeatherError> {
        let html = self.fetch_html().await?;
        let (forecast, report) = parse_forecast_document_with_report(&html)?;
        log_report(&report);
        tracing::info!(
            "Fetched forecast by {} for {} zones, expires {}",
            forecast.author,
            forecast.zones.len(),
            forecast.expires_time
        );
        Ok(forecast)
    }

    /// Fetch the forecast for an avalanche center. Only NWAC has one.
    pub async fn latest_for_center(&self, center_id: &str) -> Result<ForecastDocument, WeatherError> {
        check_center(center_id)?;
        self.fetch_latest().await
    }

    /// Cached forecast while fresh, otherwise fetch and cache a new one.
    ///
    /// A failure to write the cache is logged; the fetched forecast is still returned.
    pub async fn latest(
        &self,
        cache: &mut WeatherCache,
        now: DateTime<Utc>,
    ) -> Result<ForecastDocument, WeatherError> {
        if let Some(forecast) = cache.fresh(now) {
            tracing::debug!("Using cached forecast");
            return Ok(forecast.clone());
        }

        let forecast = self.fetch_latest().await?;
        if let Err(e) = cache.store(forecast.clone(), now) {
            tracing::warn!("Failed to cache forecast: {}", e);
        }
        Ok(forecast)
    }

    /// Fetch the forecast into the cache ahead of use
    pub async fn prefetch(&self, cache: &mut WeatherCache, now: DateTime<Utc>) -> Result<(), WeatherError> {
        tracing::info!("Starting weather prefetch");
        let forecast = self.fetch_latest().await?;
        cache.store(forecast, now)?;
        tracing::info!("Weather prefetch complete");
        Ok(())
    }
}

fn log_report(report: &ParseReport) {
    let passes = [
        ("snow level", &report.snow_level),
        ("precipitation", &report.precipitation),
        ("temperature", &report.temperature),
        ("wind", &report.wind),
    ];
    for (name, pass) in passes {
        if pass.skipped() > 0 || pass.rows_without_zone > 0 {
            tracing::warn!(
                "{} pass attached {} readings, skipped {} (no period {}, unknown zone {}, unparseable {}), {} rows without a zone",
                name,
                pass.attached,
                pass.skipped(),
                pass.no_matching_period,
                pass.unknown_zone,
                pass.unparseable_value,
                pass.rows_without_zone
            );
        }
    }
    if report.orphan_blocks > 0 {
        tracing::warn!("{} zone forecast blocks had no matching tab", report.orphan_blocks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FORECAST_PAGE: &str = include_str!("../tests/fixtures/forecast.html");
    const FORECAST_PATH: &str = "/mountain-weather-forecast/";

    fn provider_for(server: &MockServer) -> WeatherProvider {
        let config = WeatherConfig {
            forecast_url: format!("{}{}", server.uri(), FORECAST_PATH),
            ..WeatherConfig::default()
        };
        WeatherProvider::new(&config)
            .unwrap()
            .with_retry_config(RetryConfig::new(2, 1, 5))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 25, 23, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_latest() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FORECAST_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST_PAGE))
            .mount(&mock_server)
            .await;

        let forecast = provider_for(&mock_server).fetch_latest().await.unwrap();
        assert_eq!(forecast.author, "Dennis D'Amico");
        assert_eq!(forecast.zones.len(), 3);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FORECAST_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(FORECAST_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST_PAGE))
            .mount(&mock_server)
            .await;

        let forecast = provider_for(&mock_server).fetch_latest().await;
        assert!(forecast.is_ok());
    }

    #[tokio::test]
    async fn test_not_found_is_a_network_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FORECAST_PATH))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = provider_for(&mock_server).fetch_latest().await.unwrap_err();
        assert!(matches!(
            err,
            WeatherError::Network(NetworkError::ServerError { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_unparseable_page_is_a_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FORECAST_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Maintenance</body></html>"))
            .mount(&mock_server)
            .await;

        let err = provider_for(&mock_server).fetch_latest().await.unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
        assert!(err.user_message().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_other_centers_are_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST_PAGE))
            .expect(0)
            .mount(&mock_server)
            .await;

        let err = provider_for(&mock_server)
            .latest_for_center("SNFAC")
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::UnsupportedCenter(c) if c == "SNFAC"));
    }

    #[tokio::test]
    async fn test_latest_uses_fresh_cache() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FORECAST_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST_PAGE))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut cache = WeatherCache::new(dir.path(), chrono::Duration::hours(24));
        let provider = provider_for(&mock_server);

        let first = provider.latest(&mut cache, now()).await.unwrap();
        let second = provider
            .latest(&mut cache, now() + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_prefetch_fills_cache() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FORECAST_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST_PAGE))
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut cache = WeatherCache::new(dir.path(), chrono::Duration::hours(24));
        provider_for(&mock_server)
            .prefetch(&mut cache, now())
            .await
            .unwrap();

        assert!(cache.fresh(now()).is_some());
        assert!(cache.path().exists());
    }
}
