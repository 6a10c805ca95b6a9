use std::time::Duration;

use async_trait::async_trait;
use models::{Coordinates, DEFAULT_REGION_DELTA};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

const FALLBACK_MESSAGE: &str = "Error fetching location.";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeocodeError {
    #[error("Location not found.")]
    NotFound,
    #[error("{0}")]
    Request(String),
    #[error("geocoding api key is not configured")]
    MissingApiKey,
    #[error("search query must not be empty")]
    EmptyQuery,
}

impl GeocodeError {
    /// Inline message for the search field.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound => "Location not found.".into(),
            Self::Request(msg) => msg.clone(),
            Self::MissingApiKey => "Location search is not configured.".into(),
            Self::EmptyQuery => "Enter a country or city to search.".into(),
        }
    }
}

/// Free-text place name to map region.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn locate(&self, query: &str) -> Result<Coordinates, GeocodeError>;
}

/// HERE geocoding API client: one GET per lookup, first result wins.
#[derive(Clone, Debug)]
pub struct HereGeocoder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HereGeocoder {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeocodeError::Request(e.to_string()))?;
        Ok(Self { client, endpoint: endpoint.into(), api_key })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn request_url(&self, query: &str, api_key: &str) -> Result<reqwest::Url, GeocodeError> {
        let params = [("q", query), ("apiKey", api_key)];
        reqwest::Url::parse_with_params(&self.endpoint, &params).map_err(|e| GeocodeError::Request(e.to_string()))
    }
}

#[async_trait]
impl Geocoder for HereGeocoder {
    async fn locate(&self, query: &str) -> Result<Coordinates, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }
        let api_key = self.api_key.as_deref().ok_or(GeocodeError::MissingApiKey)?;
        let url = self.request_url(query, api_key)?;

        let res = self.client.get(url).send().await.map_err(|e| {
            error!(%query, error = %e, "geocoding request failed");
            GeocodeError::Request(FALLBACK_MESSAGE.into())
        })?;
        let status = res.status();
        let body: Value = res.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            error!(%query, %status, "geocoding service returned an error");
            let msg = error_message(&body).unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
            return Err(GeocodeError::Request(msg));
        }

        let coords = json_to_coords(&body).ok_or(GeocodeError::NotFound)?;
        debug!(%query, lat = coords.latitude, lng = coords.longitude, "location resolved");
        Ok(coords)
    }
}

/// First result's position as a region with default zoom.
fn json_to_coords(json_response: &Value) -> Option<Coordinates> {
    let position = &json_response["items"][0]["position"];
    let lat = position["lat"].as_f64()?;
    let lng = position["lng"].as_f64()?;
    Some(Coordinates::region(lat, lng, DEFAULT_REGION_DELTA, DEFAULT_REGION_DELTA))
}

fn error_message(body: &Value) -> Option<String> {
    ["message", "title"]
        .iter()
        .find_map(|k| body[*k].as_str())
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_to_coords_valid() {
        let json_response = r#"
{
  "items": [
    {
      "title": "Paris, Île-de-France, France",
      "id": "here:cm:namedplace:20002126",
      "resultType": "locality",
      "localityType": "city",
      "address": {
        "label": "Paris, Île-de-France, France",
        "countryCode": "FRA",
        "countryName": "France",
        "city": "Paris"
      },
      "position": { "lat": 48.85717, "lng": 2.3414 },
      "mapView": { "west": 2.22422, "south": 48.81562, "east": 2.46976, "north": 48.90216 }
    },
    {
      "title": "Paris, TX, United States",
      "position": { "lat": 33.66094, "lng": -95.55551 }
    }
  ]
}
"#;
        let des: Value = serde_json::from_str(json_response).unwrap();

        let coords = json_to_coords(&des).unwrap();

        assert_eq!(coords, Coordinates::region(48.85717, 2.3414, 0.1, 0.1));
    }

    #[test]
    fn json_to_coords_no_items() {
        let des: Value = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert!(json_to_coords(&des).is_none());
        assert!(json_to_coords(&Value::Null).is_none());
    }

    #[test]
    fn error_message_prefers_provider_text() {
        let body = serde_json::json!({ "status": 401, "title": "Unauthorized", "message": "apiKey invalid." });
        assert_eq!(error_message(&body).as_deref(), Some("apiKey invalid."));
        let body = serde_json::json!({ "status": 429, "title": "Too Many Requests" });
        assert_eq!(error_message(&body).as_deref(), Some("Too Many Requests"));
        assert_eq!(error_message(&Value::Null), None);
    }

    #[test]
    fn request_url_encodes_query() {
        let geocoder = HereGeocoder::new(
            "https://geocode.search.hereapi.com/v1/geocode",
            Some("k3y".into()),
            Duration::from_secs(5),
        )
        .unwrap();
        let url = geocoder.request_url("São Paulo & co", "k3y").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
        assert_eq!(pairs, [("q".to_string(), "São Paulo & co".to_string()), ("apiKey".to_string(), "k3y".to_string())]);
    }

    #[tokio::test]
    async fn locate_validates_before_network() {
        let no_key = HereGeocoder::new("http://127.0.0.1:9/geocode", None, Duration::from_secs(1)).unwrap();
        assert_eq!(no_key.locate("Paris").await, Err(GeocodeError::MissingApiKey));
        assert_eq!(no_key.locate("   ").await, Err(GeocodeError::EmptyQuery));
    }

    #[test]
    fn user_messages() {
        assert_eq!(GeocodeError::NotFound.user_message(), "Location not found.");
        assert_eq!(GeocodeError::Request("boom".into()).user_message(), "boom");
    }
}
