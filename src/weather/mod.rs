/// Weather provider client
///
/// Fetches current conditions for a coordinate pair and normalizes them into
/// the snapshot shape stored with each vote. Values are rounded to the same
/// precision the voting UI displays (whole degrees/mph/miles, pressure to two
/// decimals).
use crate::{
    config::WeatherConfig,
    error::{AppError, AppResult},
};
use serde::{Deserialize, Serialize};

/// Weather conditions captured at vote time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub temperature: i64,
    pub conditions: String,
    pub humidity: i64,
    pub wind_speed: i64,
    pub uv_index: f64,
    pub feels_like: i64,
    pub pressure: f64,
    pub visibility: i64,
}

/// Current conditions for a resolved place
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    /// Display name of the place, `"City, Region"`
    pub location: String,
    pub weather: WeatherSnapshot,
}

/// Provider response shapes (weatherapi.com `current.json`)
#[derive(Debug, Deserialize)]
struct ApiResponse {
    location: ApiLocation,
    current: ApiCurrent,
}

#[derive(Debug, Deserialize)]
struct ApiLocation {
    name: String,
    region: String,
}

#[derive(Debug, Deserialize)]
struct ApiCurrent {
    temp_f: f64,
    condition: ApiCondition,
    humidity: i64,
    wind_mph: f64,
    uv: f64,
    feelslike_f: f64,
    pressure_in: f64,
    vis_miles: f64,
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    text: String,
}

impl From<ApiResponse> for CurrentConditions {
    fn from(data: ApiResponse) -> Self {
        Self {
            location: format!("{}, {}", data.location.name, data.location.region),
            weather: WeatherSnapshot {
                temperature: data.current.temp_f.round() as i64,
                conditions: data.current.condition.text,
                humidity: data.current.humidity,
                wind_speed: data.current.wind_mph.round() as i64,
                uv_index: data.current.uv,
                feels_like: data.current.feelslike_f.round() as i64,
                pressure: (data.current.pressure_in * 100.0).round() / 100.0,
                visibility: data.current.vis_miles.round() as i64,
            },
        }
    }
}

/// Weather provider client
#[derive(Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    /// Create a new weather client
    pub fn new(config: &WeatherConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Fetch current conditions at a coordinate
    pub async fn current(&self, latitude: f64, longitude: f64) -> AppResult<CurrentConditions> {
        let url = format!("{}/current.json", self.base_url);
        let position = format!("{},{}", latitude, longitude);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", position.as_str()),
                ("aqi", "no"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Weather(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Weather(format!(
                "Weather API returned {}",
                response.status()
            )));
        }

        let data: ApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::Weather(format!("Invalid weather response: {}", e)))?;

        Ok(data.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_normalization() {
        let payload = r#"{
            "location": { "name": "Austin", "region": "Texas" },
            "current": {
                "temp_f": 72.6,
                "condition": { "text": "Partly cloudy" },
                "humidity": 55,
                "wind_mph": 6.9,
                "uv": 7.0,
                "feelslike_f": 74.4,
                "pressure_in": 29.917,
                "vis_miles": 9.0
            }
        }"#;

        let parsed: ApiResponse = serde_json::from_str(payload).unwrap();
        let conditions: CurrentConditions = parsed.into();

        assert_eq!(conditions.location, "Austin, Texas");
        assert_eq!(conditions.weather.temperature, 73);
        assert_eq!(conditions.weather.conditions, "Partly cloudy");
        assert_eq!(conditions.weather.humidity, 55);
        assert_eq!(conditions.weather.wind_speed, 7);
        assert_eq!(conditions.weather.uv_index, 7.0);
        assert_eq!(conditions.weather.feels_like, 74);
        assert_eq!(conditions.weather.pressure, 29.92);
        assert_eq!(conditions.weather.visibility, 9);
    }
}
