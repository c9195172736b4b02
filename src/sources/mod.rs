//! External collaborators consumed by the engine.
//!
//! Each collaborator is a small object-safe trait returning boxed futures,
//! so the assessor can hold them as `Arc<dyn ..>` and tests can swap in
//! in-memory fakes.

mod blob;
mod geocoder;
mod gsi;
mod jshis;
mod limiter;

#[cfg(test)]
pub(crate) mod testing;

use futures::future::BoxFuture;
use serde::Serialize;

use crate::error::HazardError;
use crate::models::Coordinate;
use crate::pip::RegionCode;
use crate::tile::{RasterLayer, TileAddress};

pub use blob::{DirBlobStore, HttpBlobStore, UnconfiguredBlobStore, DEFAULT_BLOB_PREFIX};
pub use geocoder::{GoogleGeocoder, DEFAULT_GEOCODING_URL};
pub use gsi::{GsiTileClient, DEFAULT_TILE_BASE_URL};
pub use jshis::{JshisClient, DEFAULT_JSHIS_URL};
pub use limiter::{FetchLimiter, FetchPermit};

/// Address → coordinate.
pub trait Geocoder: Send + Sync {
    /// Fails with `NotFound` when the address cannot be resolved.
    fn resolve<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<Coordinate, HazardError>>;
}

/// Raster tile source.
pub trait TileProvider: Send + Sync {
    /// Raw PNG bytes of one tile.
    ///
    /// `Ok(None)` means the server has no tile there, which hazard-map
    /// servers use for "nothing mapped at this location".
    fn fetch_tile(
        &self,
        layer: RasterLayer,
        tile: TileAddress,
    ) -> BoxFuture<'_, Result<Option<Vec<u8>>, HazardError>>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Per-region polygon store.
pub trait BlobStore: Send + Sync {
    /// GeoJSON FeatureCollection bytes for a region.
    fn fetch_object(&self, region: RegionCode) -> BoxFuture<'_, Result<Vec<u8>, HazardError>>;
}

/// Earthquake probabilities at a single location.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct QuakeProbability {
    /// Probability of seismic intensity 5-upper or more within 30 years
    pub prob_5strong: Option<f64>,
    /// Probability of seismic intensity 6-upper or more within 30 years
    pub prob_6strong: Option<f64>,
}

/// Point API for earthquake probabilities.
pub trait QuakeProbabilityApi: Send + Sync {
    fn lookup(&self, lat: f64, lon: f64) -> BoxFuture<'_, Result<QuakeProbability, HazardError>>;
}

/// Which of the 47 regions contains a point.
pub trait RegionResolver: Send + Sync {
    /// `Ok(None)` when the point is outside every region (e.g. at sea).
    fn resolve_region(
        &self,
        lat: f64,
        lon: f64,
    ) -> BoxFuture<'_, Result<Option<RegionCode>, HazardError>>;
}
