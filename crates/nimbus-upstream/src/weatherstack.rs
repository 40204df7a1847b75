//! Client for the weatherstack.com current-conditions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{UpstreamError, UpstreamResult};
use crate::TemperatureProvider;

const PROVIDER: &str = "weatherstack";
const DEFAULT_BASE_URL: &str = "https://api.weatherstack.com/current";

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature: f64,
}

/// Client for weatherstack.com.
pub struct WeatherStackClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl WeatherStackClient {
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
impl TemperatureProvider for WeatherStackClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn temperature(&self, location: &str) -> UpstreamResult<f64> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("access_key", self.api_key.as_str()), ("query", location)])
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

        let body: CurrentResponse =
            response
                .json()
                .await
                .map_err(|source| UpstreamError::Malformed {
                    provider: PROVIDER,
                    source,
                })?;

        debug!(%location, temperature = body.current.temperature, "weatherstack reading");
        Ok(body.current.temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_current_temperature() {
        let body = r#"{
            "request": {"query": "Ankara, Turkey"},
            "current": {"temperature": 22.0, "weather_code": 113}
        }"#;
        let parsed: CurrentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.current.temperature, 22.0);
    }

    #[test]
    fn rejects_body_without_current_block() {
        // weatherstack reports errors inside a 200 body.
        let body = r#"{"success": false, "error": {"code": 615, "type": "request_failed"}}"#;
        assert!(serde_json::from_str::<CurrentResponse>(body).is_err());
    }
}
