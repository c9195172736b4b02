use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::Coordinate;
use crate::sources::{
    DEFAULT_BLOB_PREFIX, DEFAULT_GEOCODING_URL, DEFAULT_JSHIS_URL, DEFAULT_TILE_BASE_URL,
};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub endpoints: EndpointConfig,
    pub limits: LimitConfig,
    pub service_area: ServiceArea,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EndpointConfig {
    pub tile_base_url: String,
    pub jshis_url: String,
    pub geocoding_url: String,
    /// Falls back to `GOOGLE_API_KEY` in the binary
    pub geocoding_api_key: Option<String>,
    pub blob_base_url: Option<String>,
    pub blob_dir: Option<PathBuf>,
    pub blob_prefix: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            tile_base_url: DEFAULT_TILE_BASE_URL.to_string(),
            jshis_url: DEFAULT_JSHIS_URL.to_string(),
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            geocoding_api_key: None,
            blob_base_url: None,
            blob_dir: None,
            blob_prefix: DEFAULT_BLOB_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LimitConfig {
    pub max_concurrent_fetches: usize,
    pub fetch_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 4,
            fetch_timeout_ms: 3000,
            request_timeout_ms: 12000,
        }
    }
}

impl LimitConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Bounding box of locations the hazard maps cover.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ServiceArea {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Default for ServiceArea {
    fn default() -> Self {
        Self {
            min_lat: 24.0,
            max_lat: 46.0,
            min_lon: 123.0,
            max_lon: 146.0,
        }
    }
}

impl ServiceArea {
    /// Expects a WGS84 coordinate.
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&coordinate.lat)
            && (self.min_lon..=self.max_lon).contains(&coordinate.lon)
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
