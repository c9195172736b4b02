//! Sample point generation around a center coordinate.
//!
//! Offsets are laid out in global pixel space at [`SAMPLING_ZOOM`], so a
//! one-pixel neighbour is always a different tile pixel and ring radii in
//! meters are converted with the latitude-dependent Mercator scale.

use std::f64::consts::PI;

use super::math::{from_global_pixel, meters_per_pixel, to_global_pixel};
use crate::error::HazardError;
use crate::models::{Coordinate, Precision, SamplePoint, SampleRole};

/// Zoom level every raster layer is sampled at.
pub const SAMPLING_ZOOM: u8 = 16;

pub const INNER_RING_METERS: f64 = 50.0;
pub const INNER_RING_POINTS: usize = 8;
pub const OUTER_RING_METERS: f64 = 100.0;
pub const OUTER_RING_POINTS: usize = 16;

/// N, NE, E, SE, S, SW, W, NW in pixel units (y grows southwards).
const DIRECTIONS: [(f64, f64); 8] = [
    (0.0, -1.0),
    (1.0, -1.0),
    (1.0, 0.0),
    (1.0, 1.0),
    (0.0, 1.0),
    (-1.0, 1.0),
    (-1.0, 0.0),
    (-1.0, -1.0),
];

/// Deterministic, restartable sequence of sample points.
///
/// The center always comes first. Clone the iterator to replay it.
#[derive(Debug, Clone)]
pub struct SamplePoints {
    center: Coordinate,
    origin: (f64, f64),
    pixels_per_meter: f64,
    precision: Precision,
    current: usize,
}

impl SamplePoints {
    fn total(&self) -> usize {
        match self.precision {
            Precision::Low => 1 + DIRECTIONS.len(),
            Precision::High => 1 + INNER_RING_POINTS + OUTER_RING_POINTS,
        }
    }

    fn ring_offset(&self, radius_m: f64, index: usize, count: usize) -> (f64, f64) {
        let theta = 2.0 * PI * index as f64 / count as f64;
        let r = radius_m * self.pixels_per_meter;
        (r * theta.sin(), -r * theta.cos())
    }

    fn offset_point(&self, (dx, dy): (f64, f64), role: SampleRole) -> SamplePoint {
        let (lat, lon) = from_global_pixel(self.origin.0 + dx, self.origin.1 + dy, SAMPLING_ZOOM);
        SamplePoint { lat, lon, role }
    }

    fn point_at(&self, index: usize) -> SamplePoint {
        if index == 0 {
            return SamplePoint {
                lat: self.center.lat,
                lon: self.center.lon,
                role: SampleRole::Center,
            };
        }

        match self.precision {
            Precision::Low => self.offset_point(DIRECTIONS[index - 1], SampleRole::Directional),
            Precision::High => {
                let i = index - 1;
                let offset = if i < INNER_RING_POINTS {
                    self.ring_offset(INNER_RING_METERS, i, INNER_RING_POINTS)
                } else {
                    self.ring_offset(OUTER_RING_METERS, i - INNER_RING_POINTS, OUTER_RING_POINTS)
                };
                self.offset_point(offset, SampleRole::Ring)
            }
        }
    }
}

impl Iterator for SamplePoints {
    type Item = SamplePoint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.total() {
            return None;
        }
        let point = self.point_at(self.current);
        self.current += 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total() - self.current;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SamplePoints {}

/// Sample points for a center coordinate at the given precision.
pub fn generate_sample_points(
    center: Coordinate,
    precision: Precision,
) -> Result<SamplePoints, HazardError> {
    let center = center.to_wgs84();
    let origin = to_global_pixel(center.lat, center.lon, SAMPLING_ZOOM)?;

    Ok(SamplePoints {
        center,
        origin,
        pixels_per_meter: 1.0 / meters_per_pixel(center.lat, SAMPLING_ZOOM),
        precision,
        current: 0,
    })
}
