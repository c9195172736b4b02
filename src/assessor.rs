//! Fan-out of one assessment request over every requested hazard kind.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{Config, ServiceArea};
use crate::error::HazardError;
use crate::models::{
    Coordinate, EntryMap, Handler, HazardEntry, HazardKind, HazardReport, Precision,
    ProbabilityResult, SamplePoint, UnavailableReason,
};
use crate::pip::{FillLandSearch, RegionIndexCache};
use crate::sources::{
    BlobStore, FetchLimiter, Geocoder, QuakeProbabilityApi, RegionResolver, TileProvider,
};
use crate::tile::{generate_sample_points, RasterLayer, TileSampler};

/// Where to assess.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Coordinates(Coordinate),
    /// Resolved through the geocoder
    Address(String),
}

#[derive(Debug, Clone)]
pub struct AssessmentRequest {
    pub location: Location,
    /// `None` means every kind
    pub kinds: Option<Vec<HazardKind>>,
    pub precision: Precision,
}

/// External services the assessor talks to.
pub struct Collaborators {
    pub geocoder: Arc<dyn Geocoder>,
    pub tiles: Arc<dyn TileProvider>,
    pub quake: Arc<dyn QuakeProbabilityApi>,
    pub blobs: Arc<dyn BlobStore>,
    pub regions: Arc<dyn RegionResolver>,
}

type Entries = Vec<(String, HazardEntry)>;

pub struct HazardAssessor {
    geocoder: Arc<dyn Geocoder>,
    quake: Arc<dyn QuakeProbabilityApi>,
    sampler: TileSampler,
    fill_land: FillLandSearch,
    limiter: Arc<FetchLimiter>,
    service_area: ServiceArea,
    request_timeout: Duration,
}

impl HazardAssessor {
    pub fn new(collaborators: Collaborators, config: &Config) -> Self {
        let limits = &config.limits;
        let limiter = Arc::new(FetchLimiter::new(limits.max_concurrent_fetches));
        let cache = Arc::new(RegionIndexCache::new(collaborators.blobs, limiter.clone()));

        Self {
            geocoder: collaborators.geocoder,
            quake: collaborators.quake,
            sampler: TileSampler::new(collaborators.tiles, limiter.clone(), limits.fetch_timeout()),
            fill_land: FillLandSearch::new(collaborators.regions, cache, limiter.clone()),
            limiter,
            service_area: config.service_area,
            request_timeout: limits.request_timeout(),
        }
    }

    /// Assess one location.
    ///
    /// Fails only when the location cannot be resolved or lies outside the
    /// service area. Every other problem is reported per hazard key.
    pub async fn assess(&self, request: &AssessmentRequest) -> Result<HazardReport, HazardError> {
        let span = info_span!("assess", precision = %request.precision);
        async move {
            let input = self.locate(&request.location).await?;
            let center = input.to_wgs84();
            if !center.is_finite() || !self.service_area.contains(&center) {
                return Err(HazardError::InvalidCoordinate {
                    lat: center.lat,
                    lon: center.lon,
                });
            }

            let points: Vec<SamplePoint> =
                generate_sample_points(center, request.precision)?.collect();
            let kinds = dedup_kinds(request.kinds.as_deref().unwrap_or(HazardKind::all()));
            info!(
                lat = center.lat,
                lon = center.lon,
                points = points.len(),
                kinds = kinds.len(),
                "assessing"
            );

            let deadline = Instant::now() + self.request_timeout;
            let tasks = kinds.iter().map(|kind| {
                let points = &points;
                async move {
                    match timeout_at(deadline, self.run(*kind, points, request.precision)).await {
                        Ok(entries) => entries,
                        Err(_) => {
                            warn!(kind = %kind, "hazard task timed out");
                            kind.report_keys()
                                .iter()
                                .map(|key| {
                                    (
                                        key.to_string(),
                                        HazardEntry::Unavailable(UnavailableReason::TimedOut),
                                    )
                                })
                                .collect()
                        }
                    }
                }
            });

            let mut hazard_info = EntryMap::new();
            for entries in join_all(tasks).await {
                for (key, entry) in entries {
                    hazard_info.insert(key, entry);
                }
            }

            Ok(HazardReport {
                coordinates: center,
                input_datum: input.datum,
                precision: request.precision,
                hazard_info,
            })
        }
        .instrument(span)
        .await
    }

    async fn locate(&self, location: &Location) -> Result<Coordinate, HazardError> {
        match location {
            Location::Coordinates(coordinate) => Ok(*coordinate),
            Location::Address(address) => self.geocoder.resolve(address).await,
        }
    }

    async fn run(&self, kind: HazardKind, points: &[SamplePoint], precision: Precision) -> Entries {
        match kind.handler() {
            Handler::QuakeProbability => self.quake_entries(points).await,
            Handler::Raster(layer) => {
                let key = kind.report_keys()[0];
                vec![(key.to_string(), self.raster_entry(layer, points, precision).await)]
            }
            Handler::RasterGroup(group) => {
                let results = join_all(
                    group
                        .iter()
                        .map(|(_, layer)| self.raster_entry(*layer, points, precision)),
                )
                .await;

                let mut entries = EntryMap::new();
                for ((name, _), entry) in group.iter().zip(results) {
                    entries.insert(*name, entry);
                }
                vec![(kind.report_keys()[0].to_string(), HazardEntry::Group(entries))]
            }
            Handler::PolygonSearch => {
                let outcome = self.fill_land.search(points).await;
                vec![(kind.report_keys()[0].to_string(), HazardEntry::Search(outcome))]
            }
        }
    }

    async fn raster_entry(
        &self,
        layer: RasterLayer,
        points: &[SamplePoint],
        precision: Precision,
    ) -> HazardEntry {
        match self.sampler.sample(layer, points, precision).await {
            Ok(result) => HazardEntry::Graded(result),
            Err(e) => {
                warn!(layer = layer.path(), error = %e, "layer unavailable");
                HazardEntry::Unavailable(UnavailableReason::NoCoverage)
            }
        }
    }

    async fn quake_entries(&self, points: &[SamplePoint]) -> Entries {
        let span = info_span!("quake_sample", points = points.len());
        async move {
            let lookups = points.iter().map(|p| async move {
                let _permit = self.limiter.acquire().await?;
                self.quake.lookup(p.lat, p.lon).await
            });
            let answers = join_all(lookups).await;

            let mut prob_50 = ProbabilityResult::default();
            let mut prob_60 = ProbabilityResult::default();
            let mut answered = 0usize;
            for (point, answer) in points.iter().zip(answers) {
                match answer {
                    Ok(probability) => {
                        answered += 1;
                        prob_50.record(probability.prob_5strong, point.is_center());
                        prob_60.record(probability.prob_6strong, point.is_center());
                    }
                    Err(e) => debug!(lat = point.lat, lon = point.lon, error = %e, "lookup failed"),
                }
            }

            let (entry_50, entry_60) = if answered == 0 {
                warn!("every earthquake probability lookup failed");
                (
                    HazardEntry::Unavailable(UnavailableReason::NoCoverage),
                    HazardEntry::Unavailable(UnavailableReason::NoCoverage),
                )
            } else {
                (
                    HazardEntry::Probability(prob_50),
                    HazardEntry::Probability(prob_60),
                )
            };

            let keys = HazardKind::Earthquake.report_keys();
            vec![
                (keys[0].to_string(), entry_50),
                (keys[1].to_string(), entry_60),
            ]
        }
        .instrument(span)
        .await
    }

    pub fn fill_land(&self) -> &FillLandSearch {
        &self.fill_land
    }

    pub fn limiter(&self) -> &FetchLimiter {
        &self.limiter
    }
}

fn dedup_kinds(kinds: &[HazardKind]) -> Vec<HazardKind> {
    let mut unique = Vec::with_capacity(kinds.len());
    for kind in kinds {
        if !unique.contains(kind) {
            unique.push(*kind);
        }
    }
    unique
}
