//! Avalanche center product API client.

use avy_core::{with_retry, NacConfig, NetworkError, RetryConfig};
use chrono::{DateTime, Local, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tracing::instrument;

use crate::error::NacError;
use crate::types::*;

const PRODUCT_PATH: &str = "/v2/public/product";

pub struct SynopsisClient {
    client: reqwest::Client,
    host: String,
    retry: RetryConfig,
}

impl SynopsisClient {
    pub fn new(config: &NacConfig) -> Result<Self, NacError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
        })
    }

    #[cfg(test)]
    pub fn new_with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: base_url.to_string(),
            retry: RetryConfig::new(2, 1, 5),
        }
    }

    /// Cache key for a request made at `now`, dated in local time
    fn key_at(
        &self,
        center_id: &str,
        zone_id: u32,
        requested_time: RequestedTime,
        now: DateTime<Utc>,
    ) -> QueryKey {
        let today = now.with_timezone(&Local).date_naive();
        query_key_on(&self.host, center_id, zone_id, requested_time, today)
    }

    /// Fetch the synopsis covering a zone.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch(
        &self,
        center_id: &str,
        zone_id: u32,
        requested_time: RequestedTime,
    ) -> Result<Synopsis, NacError> {
        let url = format!("{}{}", self.host, PRODUCT_PATH);
        let mut params = vec![
            ("center_id", center_id.to_string()),
            ("type", "synopsis".to_string()),
            ("zone_id", zone_id.to_string()),
        ];
        if let RequestedTime::Archived(date) = requested_time {
            // the API takes a date and picks the product published that evening
            params.push(("published_time", api_date_string(date)));
        }

        let response = with_retry(&self.retry, || self.client.get(&url).query(&params).send()).await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body = response.text().await?;
        match serde_json::from_str::<Synopsis>(&body) {
            Ok(synopsis) => Ok(Synopsis {
                zone_id: Some(zone_id),
                ..synopsis
            }),
            Err(e) => {
                tracing::warn!(url = %url, params = ?params, error = %e, "unparsable synopsis");
                Err(NacError::Decode {
                    product: "synopsis".to_string(),
                    url,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Synopsis from `cache` while it is younger than [`CACHE_TIME`], otherwise fetched and cached.
    pub async fn fetch_cached(
        &self,
        cache: &mut SynopsisCache,
        center_id: &str,
        zone_id: u32,
        requested_time: RequestedTime,
        now: DateTime<Utc>,
    ) -> Result<Synopsis, NacError> {
        let key = self.key_at(center_id, zone_id, requested_time, now);
        if let Some(synopsis) = cache.get(&key, now) {
            tracing::debug!("Using cached {}", key);
            return Ok(synopsis.clone());
        }

        let synopsis = self.fetch(center_id, zone_id, requested_time).await?;
        cache.insert(key, synopsis.clone(), now);
        Ok(synopsis)
    }

    /// Fetch a synopsis into `cache` ahead of use
    pub async fn prefetch(
        &self,
        cache: &mut SynopsisCache,
        center_id: &str,
        zone_id: u32,
        requested_time: RequestedTime,
        now: DateTime<Utc>,
    ) -> Result<(), NacError> {
        let key = self.key_at(center_id, zone_id, requested_time, now);
        tracing::trace!("Prefetching {}", key);
        let synopsis = self.fetch(center_id, zone_id, requested_time).await?;
        cache.insert(key, synopsis, now);
        Ok(())
    }
}

/// In-memory synopsis cache keyed by request
#[derive(Debug, Default)]
pub struct SynopsisCache {
    entries: HashMap<QueryKey, (DateTime<Utc>, Synopsis)>,
}

impl SynopsisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &QueryKey, now: DateTime<Utc>) -> Option<&Synopsis> {
        let (fetched_at, synopsis) = self.entries.get(key)?;
        let age = now.signed_duration_since(*fetched_at).to_std().ok()?;
        (age < CACHE_TIME).then_some(synopsis)
    }

    pub fn insert(&mut self, key: QueryKey, synopsis: Synopsis, now: DateTime<Utc>) {
        self.entries.insert(key, (now, synopsis));
    }

    /// Drop entries older than [`CACHE_TIME`]
    pub fn evict_expired(&mut self, now: DateTime<Utc>) {
        self.entries.retain(|_, (fetched_at, _)| {
            now.signed_duration_since(*fetched_at)
                .to_std()
                .map(|age| age < CACHE_TIME)
                .unwrap_or(true)
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
