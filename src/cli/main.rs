//! Command-line hazard assessment.
//!
//! Resolves a coordinate or address, samples every requested hazard layer
//! and prints the report as JSON (or as text with `--display`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use hazardscope::input::parse_location;
use hazardscope::sources::{
    BlobStore, DirBlobStore, GoogleGeocoder, GsiTileClient, HttpBlobStore, JshisClient,
    UnconfiguredBlobStore,
};
use hazardscope::{
    display, AssessmentRequest, Collaborators, Config, Coordinate, Datum, HazardAssessor,
    HazardKind, Location, Precision,
};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "assess")]
#[command(about = "Natural hazard assessment for a location in Japan")]
struct Args {
    /// Latitude (use with --lon)
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    lat: Option<f64>,

    /// Longitude (use with --lat)
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lon: Option<f64>,

    /// "lat, lon" pair or an address
    #[arg(short, long, conflicts_with = "lat")]
    input: Option<String>,

    /// Datum of the input coordinate: wgs84 or tokyo
    #[arg(long, default_value = "wgs84")]
    datum: Datum,

    /// Comma-separated hazard types (default: all)
    #[arg(long)]
    hazard_types: Option<String>,

    /// Sampling precision: low or high
    #[arg(long, default_value = "low")]
    precision: Precision,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print formatted text instead of JSON
    #[arg(long)]
    display: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn location(args: &Args) -> Result<Location> {
    match (args.lat, args.lon, &args.input) {
        (Some(lat), Some(lon), _) => {
            Ok(Location::Coordinates(Coordinate::new(lat, lon, args.datum)))
        }
        (_, _, Some(text)) => Ok(parse_location(text, args.datum)?),
        _ => anyhow::bail!("either --lat/--lon or --input is required"),
    }
}

fn blob_store(config: &Config, needed: bool) -> Result<Arc<dyn BlobStore>> {
    let endpoints = &config.endpoints;
    if let Some(dir) = &endpoints.blob_dir {
        return Ok(Arc::new(DirBlobStore::new(dir, &endpoints.blob_prefix)));
    }
    if let Some(base_url) = &endpoints.blob_base_url {
        let store = HttpBlobStore::new(
            base_url,
            &endpoints.blob_prefix,
            config.limits.fetch_timeout(),
        )?;
        return Ok(Arc::new(store));
    }
    if needed {
        warn!("no [endpoints] blob_dir or blob_base_url; large_fill_land will be unknown");
    }
    Ok(Arc::new(UnconfiguredBlobStore))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    let kinds = args
        .hazard_types
        .as_deref()
        .map(HazardKind::parse_list)
        .transpose()?;
    let wants_fill_land = kinds
        .as_ref()
        .map_or(true, |k| k.contains(&HazardKind::LargeFillLand));

    let api_key = config
        .endpoints
        .geocoding_api_key
        .clone()
        .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
        .unwrap_or_default();
    if api_key.is_empty() {
        warn!("no geocoding API key; addresses and region lookup will fail");
    }

    let timeout = config.limits.fetch_timeout();
    let geocoder = Arc::new(GoogleGeocoder::new(
        &config.endpoints.geocoding_url,
        &api_key,
        timeout,
    )?);
    let collaborators = Collaborators {
        geocoder: geocoder.clone(),
        tiles: Arc::new(GsiTileClient::new(&config.endpoints.tile_base_url, timeout)?),
        quake: Arc::new(JshisClient::new(&config.endpoints.jshis_url, timeout)?),
        blobs: blob_store(&config, wants_fill_land)?,
        regions: geocoder,
    };
    let assessor = HazardAssessor::new(collaborators, &config);

    let request = AssessmentRequest {
        location: location(&args)?,
        kinds,
        precision: args.precision,
    };
    let report = assessor.assess(&request).await?;

    let stats = assessor.fill_land().cache().stats();
    info!(
        blob_fetches = stats.blob_fetches,
        index_builds = stats.index_builds,
        polygon_queries = assessor.fill_land().queries(),
        peak_fetches = assessor.limiter().peak_in_flight(),
        "done"
    );

    if args.display {
        println!("{}", display::render(&report));
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
