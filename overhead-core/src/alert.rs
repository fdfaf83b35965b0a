//! The published alert record.
//!
//! Built fresh every tick from the selected subject (if any). Every key is
//! always present in the JSON; missing data is `null`, missing strings are
//! empty, and the nested records serialize with all-null fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enrich::{utc_text, AircraftInfo, FlightInfo};
use crate::table::TrackedAircraft;

pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 10_000;

/// One tick's alert, as consumed by the display and card renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub display: bool,
    pub refresh: bool,
    #[serde(rename = "refreshInterval")]
    pub refresh_interval_ms: u64,
    pub png_url: String,
    pub flight: String,
    pub aircraft_info: AircraftInfo,
    pub flight_info: FlightInfo,
    pub eta_minutes: Option<i64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub altitude: Option<i32>,
    pub bullseye_km: Option<f64>,
    pub flight_progress: f64,
    #[serde(with = "utc_text")]
    pub departure_time_actual: Option<DateTime<Utc>>,
    #[serde(with = "utc_text")]
    pub arrival_time_estimated: Option<DateTime<Utc>>,
    pub percent_complete: Option<f64>,
    pub temperature_c: Option<f64>,
}

/// Everything the publisher needs for one tick.
pub struct AlertInputs<'a> {
    pub now: DateTime<Utc>,
    pub display: bool,
    pub refresh: bool,
    pub refresh_interval_ms: u64,
    pub png_url: &'a str,
    pub subject: Option<&'a TrackedAircraft>,
    pub temperature_c: Option<f64>,
}

impl AlertRecord {
    pub fn build(inputs: AlertInputs<'_>) -> Self {
        let ac = match inputs.subject {
            Some(ac) => ac,
            None => {
                return AlertRecord {
                    display: inputs.display,
                    refresh: inputs.refresh,
                    refresh_interval_ms: inputs.refresh_interval_ms,
                    png_url: String::new(),
                    flight: String::new(),
                    aircraft_info: AircraftInfo::default(),
                    flight_info: FlightInfo::default(),
                    eta_minutes: None,
                    speed: None,
                    heading: None,
                    altitude: None,
                    bullseye_km: None,
                    flight_progress: 0.0,
                    departure_time_actual: None,
                    arrival_time_estimated: None,
                    percent_complete: None,
                    temperature_c: inputs.temperature_c,
                }
            }
        };

        let schedule = ac.schedule.clone().unwrap_or_default();
        let aircraft_info = ac
            .registry
            .clone()
            .unwrap_or_default()
            .with_operator_fallback(ac.flight());
        let png_url = if inputs.display {
            inputs.png_url.to_string()
        } else {
            String::new()
        };

        AlertRecord {
            display: inputs.display,
            refresh: inputs.refresh,
            refresh_interval_ms: inputs.refresh_interval_ms,
            png_url,
            flight: ac.flight().unwrap_or_default().to_string(),
            aircraft_info,
            eta_minutes: schedule.eta_minutes(inputs.now),
            speed: ac.ground_speed_kts,
            heading: ac.heading_deg,
            altitude: ac.altitude_ft,
            bullseye_km: ac.closest_approach_km,
            flight_progress: schedule.flight_progress(),
            departure_time_actual: schedule.departure_time_actual,
            arrival_time_estimated: schedule.arrival_time_estimated,
            percent_complete: schedule.percent_complete(inputs.now),
            temperature_c: inputs.temperature_c,
            flight_info: schedule,
        }
    }

    /// Whether this record carries an alert subject.
    pub fn has_subject(&self) -> bool {
        !self.flight.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
