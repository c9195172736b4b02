//! Web Mercator slippy-tile math.
//!
//! Conversions between geographic coordinates (WGS84 degrees), global pixel
//! coordinates at a zoom level, and tile/pixel addresses.

use std::f64::consts::PI;

use crate::error::HazardError;

/// Web Mercator valid latitude range
pub const MAX_LAT: f64 = 85.05112878;
pub const MIN_LAT: f64 = -MAX_LAT;

pub const TILE_SIZE: u32 = 256;
pub const MAX_ZOOM: u8 = 24;

/// Ground resolution of one pixel at the equator, zoom 0 (meters).
const EQUATOR_METERS_PER_PIXEL: f64 = 156_543.033_92;

/// Address of one 256×256 tile. Also the tile cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

/// A tile address plus the pixel inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TilePixel {
    pub tile: TileAddress,
    pub pixel_x: u32,
    pub pixel_y: u32,
}

fn world_size(zoom: u8) -> f64 {
    TILE_SIZE as f64 * 2.0_f64.powi(zoom as i32)
}

/// Project a coordinate to global pixel space at `zoom`.
///
/// The returned values are fractional; `(0, 0)` is the north-west corner
/// of the world.
pub fn to_global_pixel(lat: f64, lon: f64, zoom: u8) -> Result<(f64, f64), HazardError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) || !(-180.0..=180.0).contains(&lon) || zoom > MAX_ZOOM {
        return Err(HazardError::InvalidCoordinate { lat, lon });
    }

    let world = world_size(zoom);
    let lat_rad = lat.to_radians();

    let gx = (lon + 180.0) / 360.0 * world;
    let gy = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * world;

    // Keep the east/south edges inside the last tile
    let max = world - 1e-9;
    Ok((gx.clamp(0.0, max), gy.clamp(0.0, max)))
}

/// Inverse projection of a global pixel position.
pub fn from_global_pixel(gx: f64, gy: f64, zoom: u8) -> (f64, f64) {
    let world = world_size(zoom);
    let lon = gx / world * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * gy / world)).sinh().atan().to_degrees();
    (lat, lon)
}

/// Tile and in-tile pixel containing a coordinate.
pub fn to_tile(lat: f64, lon: f64, zoom: u8) -> Result<TilePixel, HazardError> {
    let (gx, gy) = to_global_pixel(lat, lon, zoom)?;
    let (gx, gy) = (gx.floor() as u64, gy.floor() as u64);
    let size = TILE_SIZE as u64;

    Ok(TilePixel {
        tile: TileAddress {
            zoom,
            x: (gx / size) as u32,
            y: (gy / size) as u32,
        },
        pixel_x: (gx % size) as u32,
        pixel_y: (gy % size) as u32,
    })
}

/// Coordinate of the center of a tile pixel.
pub fn pixel_center(pixel: &TilePixel) -> (f64, f64) {
    let size = TILE_SIZE as f64;
    let gx = pixel.tile.x as f64 * size + pixel.pixel_x as f64 + 0.5;
    let gy = pixel.tile.y as f64 * size + pixel.pixel_y as f64 + 0.5;
    from_global_pixel(gx, gy, pixel.tile.zoom)
}

/// Ground meters covered by one pixel at this latitude and zoom.
pub fn meters_per_pixel(lat: f64, zoom: u8) -> f64 {
    EQUATOR_METERS_PER_PIXEL * lat.to_radians().cos() / 2.0_f64.powi(zoom as i32)
}
