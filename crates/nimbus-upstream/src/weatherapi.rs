//! Client for the weatherapi.com current-conditions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{UpstreamError, UpstreamResult};
use crate::TemperatureProvider;

const PROVIDER: &str = "weatherapi";
const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1/forecast.json";

/// Response body, reduced to the field we consume.
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temp_c: f64,
}

/// Client for weatherapi.com.
pub struct WeatherApiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl WeatherApiClient {
    /// Build a client with the given key and per-call timeout.
    pub fn new(api_key: &str, timeout: Duration) -> UpstreamResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| UpstreamError::Setup {
                provider: PROVIDER,
                source,
            })?;
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// Point the client at a different base URL (for tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }
}

#[async_trait]
impl TemperatureProvider for WeatherApiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn temperature(&self, location: &str) -> UpstreamResult<f64> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", location),
                ("days", "1"),
                ("aqi", "no"),
                ("alerts", "no"),
            ])
            .send()
            .await
            .map_err(|source| UpstreamError::Request {
                provider: PROVIDER,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                provider: PROVIDER,
                status,
            });
        }

        let body: ForecastResponse =
            response
                .json()
                .await
                .map_err(|source| UpstreamError::Malformed {
                    provider: PROVIDER,
                    source,
                })?;

        debug!(%location, temperature = body.current.temp_c, "weatherapi reading");
        Ok(body.current.temp_c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_current_temperature() {
        let body = r#"{
            "location": {"name": "Istanbul", "country": "Turkey"},
            "current": {"temp_c": 20.0, "humidity": 60}
        }"#;
        let parsed: ForecastResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.current.temp_c, 20.0);
    }

    #[test]
    fn rejects_body_without_current_block() {
        let body = r#"{"error": {"code": 1006, "message": "No matching location found."}}"#;
        assert!(serde_json::from_str::<ForecastResponse>(body).is_err());
    }
}
