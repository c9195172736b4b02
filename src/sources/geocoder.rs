//! Google geocoding API, forward and reverse.

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{Geocoder, RegionResolver};
use crate::error::HazardError;
use crate::models::Coordinate;
use crate::pip::RegionCode;

pub const DEFAULT_GEOCODING_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Clone)]
pub struct GoogleGeocoder {
    client: Client,
    url: Url,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, HazardError> {
        let client = Client::builder()
            .user_agent(concat!("hazardscope/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| HazardError::upstream("geocoder", e))?;
        let url = Url::parse(url).map_err(|e| HazardError::InvalidInput(e.to_string()))?;

        Ok(Self {
            client,
            url,
            api_key: api_key.to_string(),
        })
    }

    async fn call(&self, param: (&str, &str)) -> Result<GeocodeResponse, HazardError> {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair(param.0, param.1)
            .append_pair("key", &self.api_key)
            .append_pair("language", "ja");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| HazardError::upstream("geocoder", e))?;

        response
            .json::<GeocodeResponse>()
            .await
            .map_err(|e| HazardError::upstream("geocoder", e))
    }
}

/// First result's location, or why there isn't one.
fn first_location(response: GeocodeResponse, query: &str) -> Result<Coordinate, HazardError> {
    match response.status.as_str() {
        "OK" => response
            .results
            .into_iter()
            .next()
            .map(|r| Coordinate::wgs84(r.geometry.location.lat, r.geometry.location.lng))
            .ok_or_else(|| HazardError::NotFound(query.to_string())),
        "ZERO_RESULTS" => Err(HazardError::NotFound(query.to_string())),
        other => Err(HazardError::upstream("geocoder", other)),
    }
}

/// Region named in the first result's formatted address.
fn first_region(response: GeocodeResponse) -> Result<Option<RegionCode>, HazardError> {
    match response.status.as_str() {
        "OK" => Ok(response
            .results
            .first()
            .and_then(|r| RegionCode::from_address(&r.formatted_address))),
        "ZERO_RESULTS" => Ok(None),
        other => Err(HazardError::upstream("geocoder", other)),
    }
}

impl Geocoder for GoogleGeocoder {
    fn resolve<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<Coordinate, HazardError>> {
        Box::pin(async move {
            let response = self.call(("address", address)).await?;
            let coordinate = first_location(response, address)?;
            debug!(address, lat = coordinate.lat, lon = coordinate.lon, "geocoded");
            Ok(coordinate)
        })
    }
}

impl RegionResolver for GoogleGeocoder {
    fn resolve_region(
        &self,
        lat: f64,
        lon: f64,
    ) -> BoxFuture<'_, Result<Option<RegionCode>, HazardError>> {
        Box::pin(async move {
            let latlng = format!("{},{}", lat, lon);
            let response = self.call(("latlng", &latlng)).await?;
            let region = first_region(response)?;
            if region.is_none() {
                warn!(lat, lon, "no region for point");
            }
            Ok(region)
        })
    }
}
