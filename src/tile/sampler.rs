//! Fetch, decode and classify raster tiles for a set of sample points.

use futures::future::join_all;
use hashbrown::{HashMap, HashSet};
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info_span, warn, Instrument};

use super::color::{check_tables, classify, RasterLayer};
use super::math::{to_tile, TileAddress, TilePixel};
use crate::error::HazardError;
use crate::models::{GradedResult, Precision, Reading, SamplePoint};
use crate::sources::{FetchLimiter, TileProvider};

/// Outcome of fetching one tile.
enum TileState {
    Image(RgbaImage),
    /// Server has no tile, nothing mapped
    Empty,
    Failed,
}

pub struct TileSampler {
    provider: Arc<dyn TileProvider>,
    limiter: Arc<FetchLimiter>,
    fetch_timeout: Duration,
}

impl TileSampler {
    pub fn new(
        provider: Arc<dyn TileProvider>,
        limiter: Arc<FetchLimiter>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            limiter,
            fetch_timeout,
        }
    }

    /// Sample `layer` at every point.
    ///
    /// In high precision a layer with a fallback is re-sampled on the
    /// fallback when the primary shows nothing. The fallback result is
    /// returned only when it has a hit.
    pub async fn sample(
        &self,
        layer: RasterLayer,
        points: &[SamplePoint],
        precision: Precision,
    ) -> Result<GradedResult, HazardError> {
        let primary = self.sample_layer(layer, points).await;

        let fallback = match (precision, layer.fallback()) {
            (Precision::High, Some(fallback)) => fallback,
            _ => return primary,
        };
        if matches!(&primary, Ok(result) if result.max.is_hit()) {
            return primary;
        }

        debug!(layer = layer.path(), fallback = fallback.path(), "trying fallback layer");
        match self.sample_layer(fallback, points).await {
            Ok(result) if result.max.is_hit() => Ok(result),
            _ => primary,
        }
    }

    /// Sample a single layer without any fallback.
    pub async fn sample_layer(
        &self,
        layer: RasterLayer,
        points: &[SamplePoint],
    ) -> Result<GradedResult, HazardError> {
        let span = info_span!("sample_layer", layer = layer.path(), points = points.len());
        async move {
            check_tables().map_err(|e| HazardError::InvalidLegend(e.to_string()))?;

            let pixels = points
                .iter()
                .map(|p| to_tile(p.lat, p.lon, layer.zoom()))
                .collect::<Result<Vec<TilePixel>, _>>()?;

            let mut seen = HashSet::new();
            let unique: Vec<TileAddress> = pixels
                .iter()
                .map(|p| p.tile)
                .filter(|t| seen.insert(*t))
                .collect();
            debug!(tiles = unique.len(), "fetching tiles");

            let tiles = self.fetch_tiles(layer, unique).await;

            let readings: Vec<Reading> = pixels
                .iter()
                .map(|p| read_pixel(layer, tiles.get(&p.tile), p))
                .collect();

            aggregate(layer, points, &readings)
        }
        .instrument(span)
        .await
    }

    async fn fetch_tiles(
        &self,
        layer: RasterLayer,
        tiles: Vec<TileAddress>,
    ) -> HashMap<TileAddress, TileState> {
        let fetches = tiles.into_iter().map(|tile| async move {
            let state = self.fetch_one(layer, tile).await;
            (tile, state)
        });
        join_all(fetches).await.into_iter().collect()
    }

    async fn fetch_one(&self, layer: RasterLayer, tile: TileAddress) -> TileState {
        let _permit = match self.limiter.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!(error = %e, "no fetch permit");
                return TileState::Failed;
            }
        };

        let fetched = tokio::time::timeout(
            self.fetch_timeout,
            self.provider.fetch_tile(layer, tile),
        )
        .await;

        match fetched {
            Ok(Ok(Some(bytes))) => match image::load_from_memory(&bytes) {
                Ok(img) => TileState::Image(img.to_rgba8()),
                Err(e) => {
                    warn!(z = tile.zoom, x = tile.x, y = tile.y, error = %e, "undecodable tile");
                    TileState::Failed
                }
            },
            Ok(Ok(None)) => TileState::Empty,
            Ok(Err(e)) => {
                warn!(
                    provider = self.provider.name(),
                    z = tile.zoom,
                    x = tile.x,
                    y = tile.y,
                    error = %e,
                    "tile fetch failed"
                );
                TileState::Failed
            }
            Err(_) => {
                warn!(z = tile.zoom, x = tile.x, y = tile.y, "tile fetch timed out");
                TileState::Failed
            }
        }
    }
}

fn read_pixel(layer: RasterLayer, state: Option<&TileState>, pixel: &TilePixel) -> Reading {
    match state {
        Some(TileState::Image(img)) => match img.get_pixel_checked(pixel.pixel_x, pixel.pixel_y) {
            Some(rgba) => classify(layer, rgba.0).map_or(Reading::Clear, Reading::Hit),
            None => Reading::Unavailable,
        },
        Some(TileState::Empty) => Reading::Clear,
        Some(TileState::Failed) | None => Reading::Unavailable,
    }
}

fn aggregate(
    layer: RasterLayer,
    points: &[SamplePoint],
    readings: &[Reading],
) -> Result<GradedResult, HazardError> {
    if readings.iter().all(|r| *r == Reading::Unavailable) {
        return Err(HazardError::TotalCoverageFailure {
            key: layer.path().to_string(),
        });
    }

    let max = readings
        .iter()
        .fold(Reading::Unavailable, |acc, r| acc.max(*r));
    let center = points
        .iter()
        .zip(readings)
        .find(|(p, _)| p.is_center())
        .map_or(Reading::Unavailable, |(_, r)| *r);

    Ok(GradedResult {
        max,
        center,
        clear_label: layer.clear_label(),
        layer: layer.path(),
        mode: layer.mode(),
    })
}
