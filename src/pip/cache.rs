//! Per-region index cache with single-builder initialization.
//!
//! The first caller for a region fetches the blob and builds the index;
//! concurrent callers for the same region wait on that build instead of
//! starting their own. A failed build is not cached, so the next caller
//! retries.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info_span, Instrument};

use super::{RegionCode, RegionPolygonIndex};
use crate::error::HazardError;
use crate::sources::{BlobStore, FetchLimiter};

type Slot = Arc<OnceCell<Arc<RegionPolygonIndex>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub blob_fetches: u64,
    pub index_builds: u64,
    pub hits: u64,
}

pub struct RegionIndexCache {
    store: Arc<dyn BlobStore>,
    limiter: Arc<FetchLimiter>,
    slots: DashMap<RegionCode, Slot>,
    blob_fetches: AtomicU64,
    index_builds: AtomicU64,
    hits: AtomicU64,
}

impl RegionIndexCache {
    pub fn new(store: Arc<dyn BlobStore>, limiter: Arc<FetchLimiter>) -> Self {
        Self {
            store,
            limiter,
            slots: DashMap::new(),
            blob_fetches: AtomicU64::new(0),
            index_builds: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    /// The index for `region`, building it on first use.
    pub async fn get(&self, region: RegionCode) -> Result<Arc<RegionPolygonIndex>, HazardError> {
        // Clone the slot out so no shard lock is held across the await
        let slot: Slot = self.slots.entry(region).or_default().clone();

        let mut built = false;
        let index = slot
            .get_or_try_init(|| {
                built = true;
                self.build(region)
            })
            .await?;

        if !built {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Arc::clone(index))
    }

    async fn build(&self, region: RegionCode) -> Result<Arc<RegionPolygonIndex>, HazardError> {
        let span = info_span!("region_index", region = %region);
        async move {
            let bytes = {
                let _permit = self.limiter.acquire().await?;
                self.blob_fetches.fetch_add(1, Ordering::Relaxed);
                self.store.fetch_object(region).await?
            };
            debug!(bytes = bytes.len(), "region object fetched");

            self.index_builds.fetch_add(1, Ordering::Relaxed);
            let index = tokio::task::spawn_blocking(move || {
                RegionPolygonIndex::from_geojson(region, &bytes)
            })
            .await
            .map_err(|e| HazardError::IndexBuildFailure {
                region,
                detail: e.to_string(),
            })??;

            Ok(Arc::new(index))
        }
        .instrument(span)
        .await
    }

    /// Whether a built index is cached for `region`.
    pub fn is_cached(&self, region: RegionCode) -> bool {
        self.slots
            .get(&region)
            .is_some_and(|slot| slot.initialized())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            blob_fetches: self.blob_fetches.load(Ordering::Relaxed),
            index_builds: self.index_builds.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
        }
    }
}
