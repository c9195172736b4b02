//! J-SHIS probabilistic seismic hazard mesh API.

use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::{QuakeProbability, QuakeProbabilityApi};
use crate::error::HazardError;

/// 2020 model, average case, all earthquake categories.
pub const DEFAULT_JSHIS_URL: &str =
    "https://www.j-shis.bosai.go.jp/map/api/pshm/Y2020/AVR/TTL_MTTL/meshinfo.geojson";

const PROB_5STRONG: &str = "T30_I50_PS";
const PROB_6STRONG: &str = "T30_I60_PS";

#[derive(Clone)]
pub struct JshisClient {
    client: Client,
    url: Url,
}

impl JshisClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, HazardError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HazardError::upstream("j-shis", e))?;
        let url = Url::parse(url).map_err(|e| HazardError::InvalidInput(e.to_string()))?;
        Ok(Self { client, url })
    }
}

/// Properties come back as strings ("0.12") or plain numbers depending on mesh.
fn number_property(properties: &Value, key: &str) -> Option<f64> {
    match &properties[key] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Pull both probabilities out of a meshinfo FeatureCollection.
pub(crate) fn parse_meshinfo(body: &Value) -> QuakeProbability {
    let properties = &body["features"][0]["properties"];
    QuakeProbability {
        prob_5strong: number_property(properties, PROB_5STRONG),
        prob_6strong: number_property(properties, PROB_6STRONG),
    }
}

impl QuakeProbabilityApi for JshisClient {
    fn lookup(&self, lat: f64, lon: f64) -> BoxFuture<'_, Result<QuakeProbability, HazardError>> {
        Box::pin(async move {
            let mut url = self.url.clone();
            url.query_pairs_mut()
                .append_pair("position", &format!("{},{}", lon, lat))
                .append_pair("epsg", "4326");

            let response = self
                .client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| HazardError::upstream("j-shis", e))?;

            let body: Value = response
                .json()
                .await
                .map_err(|e| HazardError::upstream("j-shis", e))?;

            Ok(parse_meshinfo(&body))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_string_and_number_properties() {
        let body = json!({
            "features": [{"properties": {"T30_I50_PS": "0.5", "T30_I60_PS": 0.1}}]
        });
        let p = parse_meshinfo(&body);
        assert_eq!(p.prob_5strong, Some(0.5));
        assert_eq!(p.prob_6strong, Some(0.1));
    }

    #[test]
    fn test_parse_empty_collection() {
        let p = parse_meshinfo(&json!({"type": "FeatureCollection", "features": []}));
        assert_eq!(p, QuakeProbability::default());
    }

    #[test]
    fn test_parse_garbage_value() {
        let body = json!({"features": [{"properties": {"T30_I50_PS": "n/a"}}]});
        assert!(parse_meshinfo(&body).prob_5strong.is_none());
    }
}
