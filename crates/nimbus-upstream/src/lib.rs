//! nimbus-upstream — provider clients for the two temperature sources.
//!
//! Each client wraps one provider's HTTPS endpoint behind the
//! [`TemperatureProvider`] trait: a single GET with a per-call timeout,
//! returning degrees Celsius or an [`UpstreamError`]. Transport failures,
//! non-2xx statuses and malformed bodies are all errors; callers do not
//! distinguish the kinds.

pub mod error;
pub mod weatherapi;
pub mod weatherstack;

use async_trait::async_trait;

pub use error::{UpstreamError, UpstreamResult};
pub use weatherapi::WeatherApiClient;
pub use weatherstack::WeatherStackClient;

/// A single upstream temperature source.
#[async_trait]
pub trait TemperatureProvider: Send + Sync {
    /// Short provider name, used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Fetch the current temperature for `location`, in °C.
    async fn temperature(&self, location: &str) -> UpstreamResult<f64>;
}
