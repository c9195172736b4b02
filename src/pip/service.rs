//! Early-exit polygon search over sample points.

use futures::future::join_all;
use futures::stream::{FuturesOrdered, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};

use super::{RegionCode, RegionIndexCache};
use crate::models::{SamplePoint, SearchOutcome};
use crate::sources::{FetchLimiter, RegionResolver};

/// Polygon presence search (large-scale fill land).
pub struct FillLandSearch {
    resolver: Arc<dyn RegionResolver>,
    cache: Arc<RegionIndexCache>,
    limiter: Arc<FetchLimiter>,
    queries: AtomicU64,
}

impl FillLandSearch {
    pub fn new(
        resolver: Arc<dyn RegionResolver>,
        cache: Arc<RegionIndexCache>,
        limiter: Arc<FetchLimiter>,
    ) -> Self {
        Self {
            resolver,
            cache,
            limiter,
            queries: AtomicU64::new(0),
        }
    }

    /// Search `points` (center first) for one inside any polygon.
    ///
    /// Points are grouped by region. Region indices load concurrently but
    /// are evaluated in order of first appearance, and each region's points
    /// in sample order, so the first match is deterministic. The first match
    /// returns immediately and drops every pending index load. The outcome
    /// records the center's own result only if its region was evaluated.
    pub async fn search(&self, points: &[SamplePoint]) -> SearchOutcome {
        let span = info_span!("fill_land_search", points = points.len());
        async move {
            let groups = self.group_by_region(points).await;
            if groups.is_empty() {
                warn!("no sample point resolved to a region");
                return SearchOutcome::Unknown;
            }

            let mut loads: FuturesOrdered<_> = groups
                .iter()
                .map(|(region, _)| self.cache.get(*region))
                .collect();

            let mut evaluated = 0usize;
            let mut center = None;
            for (region, members) in &groups {
                let index = match loads.next().await {
                    Some(Ok(index)) => index,
                    Some(Err(e)) => {
                        warn!(region = %region, error = %e, "region skipped");
                        continue;
                    }
                    None => break,
                };
                evaluated += 1;

                for point in members {
                    self.queries.fetch_add(1, Ordering::Relaxed);
                    let hit = index.contains(point.lat, point.lon);
                    if point.is_center() {
                        center = Some(hit);
                    }
                    if hit {
                        debug!(region = %region, lat = point.lat, lon = point.lon, "polygon hit");
                        return SearchOutcome::Present {
                            point: *point,
                            region: *region,
                            center,
                        };
                    }
                }
            }

            if evaluated == 0 {
                SearchOutcome::Unknown
            } else {
                SearchOutcome::Absent { center }
            }
        }
        .instrument(span)
        .await
    }

    /// Resolve every point's region concurrently, then group in first-seen order.
    async fn group_by_region(&self, points: &[SamplePoint]) -> Vec<(RegionCode, Vec<SamplePoint>)> {
        let lookups = points.iter().map(|p| async move {
            let _permit = self.limiter.acquire().await.ok()?;
            match self.resolver.resolve_region(p.lat, p.lon).await {
                Ok(region) => region,
                Err(e) => {
                    warn!(lat = p.lat, lon = p.lon, error = %e, "region lookup failed");
                    None
                }
            }
        });
        let regions = join_all(lookups).await;

        let mut groups: Vec<(RegionCode, Vec<SamplePoint>)> = Vec::new();
        for (point, region) in points.iter().zip(regions) {
            let Some(region) = region else { continue };
            match groups.iter_mut().find(|(r, _)| *r == region) {
                Some((_, members)) => members.push(*point),
                None => groups.push((region, vec![*point])),
            }
        }

        debug!(groups = groups.len(), "points grouped by region");
        groups
    }

    /// Containment checks performed so far
    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn cache(&self) -> &RegionIndexCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;
    use crate::models::Precision;
    use crate::pip::CacheStats;
    use crate::sources::testing::{square_collection, FakeBlobStore, FakeRegionResolver};
    use crate::tile::generate_sample_points;
    use std::time::{Duration, Instant};

    const LAT: f64 = 35.6586;
    const LON: f64 = 139.7454;

    fn region(code: u8) -> RegionCode {
        RegionCode::new(code).unwrap()
    }

    fn points(precision: Precision) -> Vec<SamplePoint> {
        generate_sample_points(Coordinate::wgs84(LAT, LON), precision)
            .unwrap()
            .collect()
    }

    fn search(
        resolver: FakeRegionResolver,
        store: FakeBlobStore,
    ) -> (Arc<FakeBlobStore>, FillLandSearch) {
        let store = Arc::new(store);
        let limiter = Arc::new(FetchLimiter::new(4));
        let cache = Arc::new(RegionIndexCache::new(store.clone(), limiter.clone()));
        (store, FillLandSearch::new(Arc::new(resolver), cache, limiter))
    }

    #[tokio::test]
    async fn test_center_hit_stops_after_one_query() {
        let (_, search) = search(
            FakeRegionResolver::everywhere(region(13)),
            FakeBlobStore::new().with_object(region(13), &square_collection(&[(LAT, LON, 0.0001)])),
        );

        let outcome = search.search(&points(Precision::High)).await;
        match outcome {
            SearchOutcome::Present {
                point,
                region: r,
                center,
            } => {
                assert!(point.is_center());
                assert_eq!(r, region(13));
                assert_eq!(center, Some(true));
            }
            other => panic!("expected present, got {:?}", other),
        }
        assert_eq!(search.queries(), 1);
    }

    #[tokio::test]
    async fn test_cached_region_is_not_rebuilt() {
        let (store, search) = search(
            FakeRegionResolver::everywhere(region(13)),
            FakeBlobStore::new().with_object(region(13), &square_collection(&[(36.0, 140.0, 0.01)])),
        );
        let points = points(Precision::Low);

        let absent = SearchOutcome::Absent {
            center: Some(false),
        };
        assert_eq!(search.search(&points).await, absent);
        assert_eq!(search.queries(), 9);
        let before = search.cache().stats();

        assert_eq!(search.search(&points).await, absent);
        let after = search.cache().stats();
        assert_eq!(after.blob_fetches, before.blob_fetches);
        assert_eq!(after.index_builds, before.index_builds);
        assert_eq!(store.total_fetches(), 1);
    }

    #[tokio::test]
    async fn test_hit_in_second_region() {
        // Points north of the center belong to region 11, everything else to 13
        let resolver = FakeRegionResolver::new(|lat, _| {
            Some(if lat > LAT + 1e-6 { region(11) } else { region(13) })
        });
        let north = points(Precision::Low)[1];
        let (store, search) = search(
            resolver,
            FakeBlobStore::new()
                .with_object(region(13), &square_collection(&[(30.0, 130.0, 0.01)]))
                .with_object(region(11), &square_collection(&[(north.lat, north.lon, 0.000001)])),
        );

        let outcome = search.search(&points(Precision::Low)).await;
        assert!(matches!(
            outcome,
            SearchOutcome::Present { region: r, center: Some(false), .. } if r == region(11)
        ));
        assert_eq!(store.fetches(region(13)), 1);
        assert_eq!(store.fetches(region(11)), 1);
        assert_eq!(
            search.cache().stats(),
            CacheStats {
                blob_fetches: 2,
                index_builds: 2,
                hits: 0
            }
        );
    }

    #[tokio::test]
    async fn test_every_region_failing_is_unknown() {
        let (_, search) = search(
            FakeRegionResolver::everywhere(region(13)),
            FakeBlobStore::new().with_failure(region(13)),
        );
        assert_eq!(search.search(&points(Precision::Low)).await, SearchOutcome::Unknown);
        assert_eq!(search.queries(), 0);
    }

    #[tokio::test]
    async fn test_unresolved_points_are_unknown() {
        let (_, search) = search(FakeRegionResolver::new(|_, _| None), FakeBlobStore::new());
        assert_eq!(search.search(&points(Precision::Low)).await, SearchOutcome::Unknown);
    }

    #[tokio::test]
    async fn test_one_failed_region_still_absent() {
        let resolver = FakeRegionResolver::new(|lat, _| {
            Some(if lat > LAT + 1e-6 { region(11) } else { region(13) })
        });
        let (_, search) = search(
            resolver,
            FakeBlobStore::new()
                .with_failure(region(11))
                .with_object(region(13), &square_collection(&[(30.0, 130.0, 0.01)])),
        );
        assert_eq!(
            search.search(&points(Precision::Low)).await,
            SearchOutcome::Absent {
                center: Some(false)
            }
        );
    }

    #[tokio::test]
    async fn test_hit_with_failed_center_region_leaves_center_unknown() {
        let resolver = FakeRegionResolver::new(|lat, _| {
            Some(if lat > LAT + 1e-6 { region(11) } else { region(13) })
        });
        let north = points(Precision::Low)[1];
        let (_, search) = search(
            resolver,
            FakeBlobStore::new()
                .with_failure(region(13))
                .with_object(region(11), &square_collection(&[(north.lat, north.lon, 0.000001)])),
        );

        let outcome = search.search(&points(Precision::Low)).await;
        assert!(matches!(
            outcome,
            SearchOutcome::Present { region: r, center: None, .. } if r == region(11)
        ));
        assert_eq!(outcome.center_info(), "データなし");
        let value = serde_json::to_value(outcome).unwrap();
        assert_eq!(value["status"], "present");
        assert_eq!(value["center_info"], "データなし");
    }

    #[tokio::test]
    async fn test_unresolved_center_is_not_reported_clear() {
        // Only the center fails to resolve
        let resolver = FakeRegionResolver::new(|lat, lon| {
            ((lat - LAT).abs() > 1e-9 || (lon - LON).abs() > 1e-9).then(|| region(13))
        });
        let (_, search) = search(
            resolver,
            FakeBlobStore::new().with_object(region(13), &square_collection(&[(30.0, 130.0, 0.01)])),
        );
        assert_eq!(
            search.search(&points(Precision::Low)).await,
            SearchOutcome::Absent { center: None }
        );
    }

    #[tokio::test]
    async fn test_center_hit_drops_slow_region_load() {
        let resolver = FakeRegionResolver::new(|lat, _| {
            Some(if lat > LAT + 1e-6 { region(11) } else { region(13) })
        });
        let (_, search) = search(
            resolver,
            FakeBlobStore::new()
                .with_object(region(13), &square_collection(&[(LAT, LON, 0.0001)]))
                .with_object(region(11), &square_collection(&[(30.0, 130.0, 0.01)]))
                .with_region_delay(region(11), Duration::from_secs(3)),
        );

        let started = Instant::now();
        let outcome = tokio::time::timeout(
            Duration::from_secs(1),
            search.search(&points(Precision::Low)),
        )
        .await
        .expect("search should not wait for the slow region");

        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(matches!(
            outcome,
            SearchOutcome::Present { region: r, center: Some(true), .. } if r == region(13)
        ));
        assert!(!search.cache().is_cached(region(11)));
        assert!(search.cache().is_cached(region(13)));
        assert_eq!(search.queries(), 1);
    }
}
