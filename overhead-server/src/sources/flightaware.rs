//! FlightAware live flight page scraper.
//!
//! The page embeds its state as `trackpollBootstrap = {...};</script>`; the
//! first entry under `flights`, in page order (serde_json `preserve_order`),
//! is the one we want. Times are epoch seconds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use overhead_core::FlightInfo;

use super::FlightSchedule;

const BOOTSTRAP_MARKER: &str = "trackpollBootstrap = ";
const BOOTSTRAP_END: &str = ";</script>";

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

pub struct FlightAwareSchedule {
    base_url: String,
    client: reqwest::Client,
}

impl FlightAwareSchedule {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        FlightAwareSchedule {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

// ---------------------------------------------------------------------------
// Bootstrap document
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct Bootstrap {
    flights: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawFlight {
    friendly_ident: Option<String>,
    origin: Option<RawAirport>,
    destination: Option<RawAirport>,
    gate_departure_times: Option<RawTimes>,
    takeoff_times: Option<RawTimes>,
    landing_times: Option<RawTimes>,
    gate_arrival_times: Option<RawTimes>,
    distance: Option<RawDistance>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawAirport {
    friendly_location: Option<String>,
    iata: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawTimes {
    estimated: Option<i64>,
    actual: Option<i64>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawDistance {
    elapsed: Option<f64>,
    remaining: Option<f64>,
}

fn epoch(secs: Option<i64>) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs?, 0)
}

/// Slice the bootstrap JSON out of the page HTML.
pub fn extract_bootstrap(html: &str) -> Option<&str> {
    let start = html.find(BOOTSTRAP_MARKER)? + BOOTSTRAP_MARKER.len();
    let rest = &html[start..];
    let end = rest.find(BOOTSTRAP_END)?;
    Some(rest[..end].trim())
}

/// Parse a flight page into a `FlightInfo`. `callsign` fills the flight
/// field when the page has no friendly ident.
pub fn parse_flight_page(html: &str, callsign: &str) -> Option<FlightInfo> {
    let json = extract_bootstrap(html)?;
    let bootstrap: Bootstrap = serde_json::from_str(json).ok()?;
    let first = bootstrap.flights.into_iter().next()?.1;
    let raw: RawFlight = serde_json::from_value(first).ok()?;
    let origin = raw.origin.unwrap_or_default();
    let destination = raw.destination.unwrap_or_default();
    let departure = raw.gate_departure_times.unwrap_or_default();
    let takeoff = raw.takeoff_times.unwrap_or_default();
    let landing = raw.landing_times.unwrap_or_default();
    let arrival = raw.gate_arrival_times.unwrap_or_default();
    let distance = raw.distance.unwrap_or_default();

    Some(FlightInfo {
        flight: raw.friendly_ident.or_else(|| Some(callsign.to_string())),
        origin: origin.friendly_location,
        origin_iata: origin.iata,
        destination: destination.friendly_location,
        destination_iata: destination.iata,
        departure_time_estimated: epoch(departure.estimated),
        departure_time_actual: epoch(departure.actual),
        takeoff_time_estimated: epoch(takeoff.estimated),
        takeoff_time_actual: epoch(takeoff.actual),
        landing_time_estimated: epoch(landing.estimated),
        landing_time_actual: epoch(landing.actual),
        arrival_time_estimated: epoch(arrival.estimated),
        arrival_time_actual: epoch(arrival.actual),
        distance_elapsed_nm: distance.elapsed,
        distance_remaining_nm: distance.remaining,
    })
}

#[async_trait]
impl FlightSchedule for FlightAwareSchedule {
    async fn lookup(&self, callsign: &str) -> Option<FlightInfo> {
        let callsign = callsign.trim();
        if callsign.is_empty() {
            return None;
        }
        let url = format!("{}/{}", self.base_url, callsign);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, BROWSER_UA)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let html = match response {
            Ok(r) => match r.text().await {
                Ok(t) => t,
                Err(e) => {
                    warn!(flight = callsign, error = %e, "schedule page read failed");
                    return None;
                }
            },
            Err(e) => {
                warn!(flight = callsign, error = %e, "schedule request failed");
                return None;
            }
        };

        let info = parse_flight_page(&html, callsign);
        if info.is_none() {
            debug!(flight = callsign, "schedule: no flight data on page");
        }
        info
    }
}
