//! JSON file cache for the latest normalized forecast.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::WeatherError;
use crate::types::ForecastDocument;

/// Key the latest mountain-weather forecast is stored under
pub const QUERY_KEY: &str = "nwac-weather";

const CACHE_FILE: &str = "weather_cache.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    fetched_at: DateTime<Utc>,
    forecast: ForecastDocument,
}

#[derive(Debug)]
pub struct WeatherCache {
    cache_path: PathBuf,
    ttl: Duration,
    data: Option<CacheEntry>,
}

impl WeatherCache {
    /// Empty cache stored under `config_dir`
    pub fn new(config_dir: &Path, ttl: Duration) -> Self {
        Self {
            cache_path: config_dir.join(CACHE_FILE),
            ttl,
            data: None,
        }
    }

    /// Cache stored under `config_dir`, primed from disk.
    ///
    /// A missing or unreadable file leaves the cache empty.
    pub fn load(config_dir: &Path, ttl: Duration) -> Self {
        let mut cache = Self::new(config_dir, ttl);
        if !cache.cache_path.exists() {
            return cache;
        }

        match fs::read_to_string(&cache.cache_path)
            .map_err(|e| e.to_string())
            .and_then(|json| serde_json::from_str::<CacheEntry>(&json).map_err(|e| e.to_string()))
        {
            Ok(entry) if entry.key == QUERY_KEY => {
                tracing::debug!("Loaded cached forecast fetched at {}", entry.fetched_at);
                cache.data = Some(entry);
            }
            Ok(entry) => {
                tracing::warn!("Ignoring weather cache entry with key {}", entry.key);
            }
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable weather cache {}: {}",
                    cache.cache_path.display(),
                    e
                );
            }
        }
        cache
    }

    pub fn path(&self) -> &Path {
        &self.cache_path
    }

    /// When the cached forecast was fetched, if there is one
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.data.as_ref().map(|entry| entry.fetched_at)
    }

    /// The cached forecast if it was fetched less than one TTL before `now`
    pub fn fresh(&self, now: DateTime<Utc>) -> Option<&ForecastDocument> {
        self.data
            .as_ref()
            .filter(|entry| now.signed_duration_since(entry.fetched_at) < self.ttl)
            .map(|entry| &entry.forecast)
    }

    /// The cached forecast regardless of age
    pub fn stale(&self) -> Option<&ForecastDocument> {
        self.data.as_ref().map(|entry| &entry.forecast)
    }

    /// Replace the cached forecast and write it to disk
    pub fn store(&mut self, forecast: ForecastDocument, now: DateTime<Utc>) -> Result<(), WeatherError> {
        let entry = CacheEntry {
            key: QUERY_KEY.to_string(),
            fetched_at: now,
            forecast,
        };

        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent).map_err(|e| WeatherError::Cache(e.to_string()))?;
        }
        let json =
            serde_json::to_string_pretty(&entry).map_err(|e| WeatherError::Cache(e.to_string()))?;
        fs::write(&self.cache_path, json).map_err(|e| WeatherError::Cache(e.to_string()))?;

        tracing::debug!("Cached forecast at {}", self.cache_path.display());
        self.data = Some(entry);
        Ok(())
    }

    /// Drop the cached forecast, in memory and on disk
    pub fn invalidate(&mut self) -> Result<(), WeatherError> {
        self.data = None;
        if self.cache_path.exists() {
            fs::remove_file(&self.cache_path).map_err(|e| WeatherError::Cache(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::PeriodLabel;
    use crate::types::ForecastPeriod;
    use chrono::{FixedOffset, TimeZone, Weekday};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn forecast() -> ForecastDocument {
        let offset = FixedOffset::west_opt(8 * 3600).unwrap();
        let mut zones = BTreeMap::new();
        zones.insert(
            "Olympics".to_string(),
            vec![ForecastPeriod::new(PeriodLabel::night(Weekday::Wed), "Mostly clear.")],
        );
        ForecastDocument {
            author: "Dennis D'Amico".into(),
            published_time: offset.with_ymd_and_hms(2023, 1, 25, 14, 0, 0).unwrap(),
            expires_time: offset.with_ymd_and_hms(2023, 1, 26, 7, 0, 0).unwrap(),
            synopsis: None,
            zones,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 25, 23, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_cache_has_nothing_fresh() {
        let dir = TempDir::new().unwrap();
        let cache = WeatherCache::load(dir.path(), Duration::hours(24));
        assert!(cache.fresh(now()).is_none());
        assert!(cache.fetched_at().is_none());
    }

    #[test]
    fn test_store_then_reload() {
        let dir = TempDir::new().unwrap();
        let mut cache = WeatherCache::new(dir.path(), Duration::hours(24));
        cache.store(forecast(), now()).unwrap();
        assert!(cache.path().exists());

        let reloaded = WeatherCache::load(dir.path(), Duration::hours(24));
        assert_eq!(reloaded.fresh(now()), Some(&forecast()));
        assert_eq!(reloaded.fetched_at(), Some(now()));
    }

    #[test]
    fn test_entry_goes_stale_after_ttl() {
        let dir = TempDir::new().unwrap();
        let mut cache = WeatherCache::new(dir.path(), Duration::hours(24));
        cache.store(forecast(), now()).unwrap();

        let almost = now() + Duration::hours(24) - Duration::seconds(1);
        assert!(cache.fresh(almost).is_some());
        assert!(cache.fresh(now() + Duration::hours(24)).is_none());
        assert!(cache.stale().is_some());
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        let dir = TempDir::new().unwrap();
        let mut cache = WeatherCache::new(dir.path(), Duration::zero());
        cache.store(forecast(), now()).unwrap();
        assert!(cache.fresh(now()).is_none());
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CACHE_FILE), "{ not json").unwrap();
        let cache = WeatherCache::load(dir.path(), Duration::hours(24));
        assert!(cache.stale().is_none());
    }

    #[test]
    fn test_invalidate_removes_file() {
        let dir = TempDir::new().unwrap();
        let mut cache = WeatherCache::new(dir.path(), Duration::hours(24));
        cache.store(forecast(), now()).unwrap();

        cache.invalidate().unwrap();
        assert!(!cache.path().exists());
        assert!(cache.fresh(now()).is_none());

        // second invalidate is a no-op
        cache.invalidate().unwrap();
    }
}
