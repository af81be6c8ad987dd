/// Free-text place lookup via Nominatim
use crate::{
    config::GeocodingConfig,
    error::{AppError, AppResult},
};
use serde::Deserialize;

/// A geocoded coordinate pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Nominatim search result row (coordinates are returned as strings)
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Geocoding client
#[derive(Clone)]
pub struct GeocodeClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeocodeClient {
    /// Create a new geocoding client
    pub fn new(config: &GeocodingConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Look up a free-text location such as `"Austin, Texas"`.
    ///
    /// Returns `None` when the provider has no match for the query; the first
    /// result wins otherwise.
    pub async fn lookup(&self, query: &str) -> AppResult<Option<Coordinates>> {
        let url = format!("{}/search", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[("format", "json"), ("q", query), ("limit", "1")])
            .send()
            .await
            .map_err(|e| AppError::Geocoding(format!("Lookup request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Geocoding(format!(
                "Geocoding service returned {}",
                response.status()
            )));
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| AppError::Geocoding(format!("Invalid geocoding response: {}", e)))?;

        let Some(place) = places.first() else {
            return Ok(None);
        };

        let latitude = place
            .lat
            .parse()
            .map_err(|_| AppError::Geocoding(format!("Invalid latitude: {}", place.lat)))?;
        let longitude = place
            .lon
            .parse()
            .map_err(|_| AppError::Geocoding(format!("Invalid longitude: {}", place.lon)))?;

        Ok(Some(Coordinates {
            latitude,
            longitude,
        }))
    }
}
