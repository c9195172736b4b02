//! Raster side of the engine: tile math, sample points, legend colors and
//! the concurrent tile sampler.

pub mod color;
pub mod math;
pub mod sampler;
pub mod sampling;

pub use color::{check_tables, classify, validate_table, ColorClass, LayerMode, RasterLayer};
pub use math::{
    from_global_pixel, meters_per_pixel, pixel_center, to_global_pixel, to_tile, TileAddress,
    TilePixel, MAX_LAT, MIN_LAT, TILE_SIZE,
};
pub use sampler::TileSampler;
pub use sampling::{generate_sample_points, SamplePoints, SAMPLING_ZOOM};
