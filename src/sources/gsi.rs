//! Hazard-map raster tiles over HTTP (GSI disaportal layout).

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::TileProvider;
use crate::error::HazardError;
use crate::tile::{RasterLayer, TileAddress};

pub const DEFAULT_TILE_BASE_URL: &str = "https://disaportaldata.gsi.go.jp/raster/";

/// Fetches `{base}/{layer}/{z}/{x}/{y}.png`.
#[derive(Clone)]
pub struct GsiTileClient {
    client: Client,
    base_url: Url,
}

/// Parse a base URL so that `join` appends instead of replacing the last segment.
pub(crate) fn directory_url(base: &str) -> Result<Url, HazardError> {
    let with_slash = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    Url::parse(&with_slash)
        .map_err(|e| HazardError::InvalidInput(format!("bad base url {}: {}", base, e)))
}

impl GsiTileClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, HazardError> {
        let client = Client::builder()
            .user_agent(concat!("hazardscope/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| HazardError::upstream("tile client", e))?;

        Ok(Self {
            client,
            base_url: directory_url(base_url)?,
        })
    }

    pub fn tile_url(&self, layer: RasterLayer, tile: TileAddress) -> Result<Url, HazardError> {
        self.base_url
            .join(&format!(
                "{}/{}/{}/{}.png",
                layer.path(),
                tile.zoom,
                tile.x,
                tile.y
            ))
            .map_err(|e| HazardError::InvalidInput(e.to_string()))
    }
}

impl TileProvider for GsiTileClient {
    fn fetch_tile(
        &self,
        layer: RasterLayer,
        tile: TileAddress,
    ) -> BoxFuture<'_, Result<Option<Vec<u8>>, HazardError>> {
        Box::pin(async move {
            let url = self.tile_url(layer, tile)?;
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| HazardError::upstream(self.name(), e))?;

            // No tile at all: nothing is mapped here
            if response.status() == StatusCode::NOT_FOUND {
                debug!(url = %url, "tile not present");
                return Ok(None);
            }

            let response = response
                .error_for_status()
                .map_err(|e| HazardError::upstream(self.name(), e))?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| HazardError::upstream(self.name(), e))?;

            Ok(Some(bytes.to_vec()))
        })
    }

    fn name(&self) -> &str {
        "gsi tiles"
    }
}
