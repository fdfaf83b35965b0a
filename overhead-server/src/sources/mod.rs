//! Enrichment and render collaborators.
//!
//! Schedule and weather lookups resolve to `None` on not-found, error, or
//! timeout. The registry separates a definite not-found (`Ok(None)`) from a
//! failed call (`Err`) so only the former is remembered. Collaborators never
//! touch the table.

pub mod adsbdb;
pub mod flightaware;
pub mod weather;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use overhead_core::{AircraftInfo, FlightInfo, LatLon, Result};

pub use adsbdb::AdsbdbRegistry;
pub use flightaware::FlightAwareSchedule;
pub use weather::OpenMeteo;

/// Airframe metadata keyed by identity code.
#[async_trait]
pub trait AircraftRegistry: Send + Sync {
    /// `Ok(None)` when the registry has no record for `hex`; `Err` when the
    /// registry could not be asked.
    async fn lookup(&self, hex: &str) -> Result<Option<AircraftInfo>>;
}

/// Route and timing data keyed by callsign.
#[async_trait]
pub trait FlightSchedule: Send + Sync {
    async fn lookup(&self, callsign: &str) -> Option<FlightInfo>;
}

/// Current surface temperature in Celsius.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn temperature_c(&self, at: LatLon) -> Option<f64>;
}

/// External job that renders the flight card image.
#[async_trait]
pub trait RenderTrigger: Send + Sync {
    /// Launch the render job without waiting for it. Returns whether it
    /// was launched.
    async fn trigger(&self, alert_path: &Path, flight: &str) -> bool;

    /// Modification time of the rendered asset, `None` if it doesn't exist.
    async fn asset_modified(&self) -> Option<DateTime<Utc>>;
}

/// The four collaborators the loop talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub registry: Arc<dyn AircraftRegistry>,
    pub schedule: Arc<dyn FlightSchedule>,
    pub weather: Arc<dyn WeatherSource>,
    pub render: Arc<dyn RenderTrigger>,
}

/// Shared HTTP client for the lookup collaborators.
pub fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("overhead/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
