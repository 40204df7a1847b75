//! nimbus-fanout — one upstream fan-out per frozen batch.
//!
//! `FanOut` implements the coalescer's [`Fetch`] seam: both provider
//! calls run concurrently, the batch fails if either fails, and a
//! successful aggregation is handed to the persistor (fire-and-forget)
//! before the result returns to the coalescer.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use nimbus_coalescer::{Aggregate, CoalesceError, CoalesceResult, Fetch};
use nimbus_store::{NewWeatherQuery, Persistor};
use nimbus_upstream::TemperatureProvider;

/// Parallel dispatch to both temperature providers.
pub struct FanOut {
    provider_a: Arc<dyn TemperatureProvider>,
    provider_b: Arc<dyn TemperatureProvider>,
    persistor: Persistor,
}

impl FanOut {
    /// Create a fan-out over the two providers.
    pub fn new(
        provider_a: Arc<dyn TemperatureProvider>,
        provider_b: Arc<dyn TemperatureProvider>,
        persistor: Persistor,
    ) -> Self {
        Self {
            provider_a,
            provider_b,
            persistor,
        }
    }
}

#[async_trait]
impl Fetch for FanOut {
    async fn fetch(&self, location: &str, request_count: usize) -> CoalesceResult<Aggregate> {
        let (a, b) = tokio::join!(
            self.provider_a.temperature(location),
            self.provider_b.temperature(location)
        );

        // Either failure fails the whole batch; when both fail, the
        // first provider's error is the one reported.
        let service_a_temp = a.map_err(|e| {
            warn!(%location, provider = self.provider_a.name(), error = %e, "provider call failed");
            CoalesceError::Upstream(e.to_string())
        })?;
        let service_b_temp = b.map_err(|e| {
            warn!(%location, provider = self.provider_b.name(), error = %e, "provider call failed");
            CoalesceError::Upstream(e.to_string())
        })?;

        let average_temp = (service_a_temp + service_b_temp) / 2.0;
        debug!(
            %location,
            service_a_temp,
            service_b_temp,
            average_temp,
            request_count,
            "fan-out complete"
        );

        self.persistor.submit(NewWeatherQuery {
            location: location.to_string(),
            service_1_temperature: service_a_temp,
            service_2_temperature: service_b_temp,
            request_count: request_count as i64,
        });

        Ok(Aggregate {
            location: location.to_string(),
            service_a_temp,
            service_b_temp,
            average_temp,
        })
    }
}
