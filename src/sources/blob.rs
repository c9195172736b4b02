//! Per-region GeoJSON objects, from a local directory or over HTTP.

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::gsi::directory_url;
use super::BlobStore;
use crate::error::HazardError;
use crate::pip::RegionCode;

pub const DEFAULT_BLOB_PREFIX: &str = "A54-23_GEOJSON/A54-23_";

fn object_key(prefix: &str, region: RegionCode) -> String {
    format!("{}{}.geojson", prefix, region)
}

/// Reads `{root}/{prefix}{code}.geojson`.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: PathBuf,
    prefix: String,
}

impl DirBlobStore {
    pub fn new(root: impl Into<PathBuf>, prefix: &str) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.to_string(),
        }
    }

    pub fn object_path(&self, region: RegionCode) -> PathBuf {
        self.root.join(object_key(&self.prefix, region))
    }
}

impl BlobStore for DirBlobStore {
    fn fetch_object(&self, region: RegionCode) -> BoxFuture<'_, Result<Vec<u8>, HazardError>> {
        Box::pin(async move {
            let path = self.object_path(region);
            debug!(path = %path.display(), "reading region object");
            tokio::fs::read(&path).await.map_err(|e| match e.kind() {
                ErrorKind::NotFound => HazardError::NotFound(path.display().to_string()),
                _ => HazardError::upstream("blob dir", e),
            })
        })
    }
}

/// Fetches `{base}/{prefix}{code}.geojson`.
#[derive(Clone)]
pub struct HttpBlobStore {
    client: Client,
    base_url: Url,
    prefix: String,
}

impl HttpBlobStore {
    pub fn new(base_url: &str, prefix: &str, timeout: Duration) -> Result<Self, HazardError> {
        let client = Client::builder()
            .user_agent(concat!("hazardscope/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| HazardError::upstream("blob store", e))?;

        Ok(Self {
            client,
            base_url: directory_url(base_url)?,
            prefix: prefix.to_string(),
        })
    }

    pub fn object_url(&self, region: RegionCode) -> Result<Url, HazardError> {
        self.base_url
            .join(&object_key(&self.prefix, region))
            .map_err(|e| HazardError::InvalidInput(e.to_string()))
    }
}

impl BlobStore for HttpBlobStore {
    fn fetch_object(&self, region: RegionCode) -> BoxFuture<'_, Result<Vec<u8>, HazardError>> {
        Box::pin(async move {
            let url = self.object_url(region)?;
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| HazardError::upstream("blob store", e))?;

            if response.status() == StatusCode::NOT_FOUND {
                return Err(HazardError::NotFound(url.to_string()));
            }

            let bytes = response
                .error_for_status()
                .map_err(|e| HazardError::upstream("blob store", e))?
                .bytes()
                .await
                .map_err(|e| HazardError::upstream("blob store", e))?;

            Ok(bytes.to_vec())
        })
    }
}

/// Stand-in when no region objects are configured; every fetch fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredBlobStore;

impl BlobStore for UnconfiguredBlobStore {
    fn fetch_object(&self, region: RegionCode) -> BoxFuture<'_, Result<Vec<u8>, HazardError>> {
        Box::pin(async move {
            Err(HazardError::upstream(
                "blob store",
                format!("not configured, region {} skipped", region),
            ))
        })
    }
}
