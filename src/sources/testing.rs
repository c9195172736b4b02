//! In-memory collaborators for unit tests.

use futures::future::BoxFuture;
use hashbrown::{HashMap, HashSet};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{
    BlobStore, Geocoder, QuakeProbability, QuakeProbabilityApi, RegionResolver, TileProvider,
};
use crate::error::HazardError;
use crate::models::Coordinate;
use crate::pip::RegionCode;
use crate::tile::{RasterLayer, TileAddress, TILE_SIZE};

/// Encode a 256×256 tile whose pixels come from `paint(x, y)`.
pub(crate) fn png_tile(paint: impl Fn(u32, u32) -> [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_fn(TILE_SIZE, TILE_SIZE, |x, y| Rgba(paint(x, y)));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png)
        .expect("png encoding into memory");
    bytes.into_inner()
}

pub(crate) fn solid_tile(rgba: [u8; 4]) -> Vec<u8> {
    png_tile(|_, _| rgba)
}

pub(crate) const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// What the fake tile server answers for one tile.
#[derive(Debug, Clone)]
pub(crate) enum TileReply {
    Png(Vec<u8>),
    /// HTTP 404
    Missing,
    Fail,
    /// Never completes
    Stall,
}

type TilePainter = dyn Fn(RasterLayer, TileAddress) -> TileReply + Send + Sync;

pub(crate) struct FakeTileProvider {
    reply: Box<TilePainter>,
    fetches: Mutex<Vec<(RasterLayer, TileAddress)>>,
}

impl FakeTileProvider {
    pub(crate) fn new(
        reply: impl Fn(RasterLayer, TileAddress) -> TileReply + Send + Sync + 'static,
    ) -> Self {
        Self {
            reply: Box::new(reply),
            fetches: Mutex::new(Vec::new()),
        }
    }

    /// Every layer returns the same tile everywhere.
    pub(crate) fn uniform(reply: TileReply) -> Self {
        Self::new(move |_, _| reply.clone())
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub(crate) fn fetches_for(&self, layer: RasterLayer) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == layer)
            .count()
    }
}

impl TileProvider for FakeTileProvider {
    fn fetch_tile(
        &self,
        layer: RasterLayer,
        tile: TileAddress,
    ) -> BoxFuture<'_, Result<Option<Vec<u8>>, HazardError>> {
        self.fetches.lock().unwrap().push((layer, tile));
        let reply = (self.reply)(layer, tile);
        Box::pin(async move {
            match reply {
                TileReply::Png(bytes) => Ok(Some(bytes)),
                TileReply::Missing => Ok(None),
                TileReply::Fail => Err(HazardError::upstream("fake tiles", "503")),
                TileReply::Stall => std::future::pending().await,
            }
        })
    }

    fn name(&self) -> &str {
        "fake tiles"
    }
}

type QuakeFn = dyn Fn(f64, f64) -> Result<QuakeProbability, HazardError> + Send + Sync;

pub(crate) struct FakeQuakeApi {
    answer: Box<QuakeFn>,
    pub(crate) calls: AtomicUsize,
}

impl FakeQuakeApi {
    pub(crate) fn new(
        answer: impl Fn(f64, f64) -> Result<QuakeProbability, HazardError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            answer: Box::new(answer),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn constant(prob_5strong: f64, prob_6strong: f64) -> Self {
        Self::new(move |_, _| {
            Ok(QuakeProbability {
                prob_5strong: Some(prob_5strong),
                prob_6strong: Some(prob_6strong),
            })
        })
    }
}

impl QuakeProbabilityApi for FakeQuakeApi {
    fn lookup(&self, lat: f64, lon: f64) -> BoxFuture<'_, Result<QuakeProbability, HazardError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = (self.answer)(lat, lon);
        Box::pin(async move { answer })
    }
}

#[derive(Default)]
pub(crate) struct FakeBlobStore {
    objects: HashMap<RegionCode, Vec<u8>>,
    failing: HashSet<RegionCode>,
    delay: Option<Duration>,
    region_delays: HashMap<RegionCode, Duration>,
    fetches: Mutex<HashMap<RegionCode, usize>>,
}

impl FakeBlobStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_object(mut self, region: RegionCode, geojson: &str) -> Self {
        self.objects.insert(region, geojson.as_bytes().to_vec());
        self
    }

    pub(crate) fn with_failure(mut self, region: RegionCode) -> Self {
        self.failing.insert(region);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn with_region_delay(mut self, region: RegionCode, delay: Duration) -> Self {
        self.region_delays.insert(region, delay);
        self
    }

    pub(crate) fn fetches(&self, region: RegionCode) -> usize {
        self.fetches.lock().unwrap().get(&region).copied().unwrap_or(0)
    }

    pub(crate) fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }
}

impl BlobStore for FakeBlobStore {
    fn fetch_object(&self, region: RegionCode) -> BoxFuture<'_, Result<Vec<u8>, HazardError>> {
        *self.fetches.lock().unwrap().entry(region).or_insert(0) += 1;
        Box::pin(async move {
            if let Some(delay) = self.region_delays.get(&region).copied().or(self.delay) {
                tokio::time::sleep(delay).await;
            }
            if self.failing.contains(&region) {
                return Err(HazardError::upstream("fake blobs", "connection reset"));
            }
            self.objects
                .get(&region)
                .cloned()
                .ok_or_else(|| HazardError::NotFound(region.to_string()))
        })
    }
}

type RegionFn = dyn Fn(f64, f64) -> Option<RegionCode> + Send + Sync;

pub(crate) struct FakeRegionResolver {
    region_of: Box<RegionFn>,
}

impl FakeRegionResolver {
    pub(crate) fn new(
        region_of: impl Fn(f64, f64) -> Option<RegionCode> + Send + Sync + 'static,
    ) -> Self {
        Self {
            region_of: Box::new(region_of),
        }
    }

    pub(crate) fn everywhere(region: RegionCode) -> Self {
        Self::new(move |_, _| Some(region))
    }
}

impl RegionResolver for FakeRegionResolver {
    fn resolve_region(
        &self,
        lat: f64,
        lon: f64,
    ) -> BoxFuture<'_, Result<Option<RegionCode>, HazardError>> {
        let region = (self.region_of)(lat, lon);
        Box::pin(async move { Ok(region) })
    }
}

#[derive(Default)]
pub(crate) struct FakeGeocoder {
    addresses: HashMap<String, Coordinate>,
}

impl FakeGeocoder {
    pub(crate) fn with_address(mut self, address: &str, coordinate: Coordinate) -> Self {
        self.addresses.insert(address.to_string(), coordinate);
        self
    }
}

impl Geocoder for FakeGeocoder {
    fn resolve<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<Coordinate, HazardError>> {
        let found = self
            .addresses
            .get(address)
            .copied()
            .ok_or_else(|| HazardError::NotFound(address.to_string()));
        Box::pin(async move { found })
    }
}

/// A FeatureCollection with one axis-aligned square polygon per entry.
pub(crate) fn square_collection(squares: &[(f64, f64, f64)]) -> String {
    let features: Vec<serde_json::Value> = squares
        .iter()
        .map(|&(lat, lon, half)| {
            serde_json::json!({
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [lon - half, lat - half],
                        [lon + half, lat - half],
                        [lon + half, lat + half],
                        [lon - half, lat + half],
                        [lon - half, lat - half]
                    ]]
                }
            })
        })
        .collect();
    serde_json::json!({"type": "FeatureCollection", "features": features}).to_string()
}
