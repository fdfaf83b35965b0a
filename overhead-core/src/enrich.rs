//! Enrichment records and the timing math derived from them.
//!
//! `AircraftInfo` comes from the airframe registry (keyed by identity code),
//! `FlightInfo` from the flight-schedule source (keyed by callsign). Both are
//! cached on the tracked aircraft; ETA and completion are recomputed from the
//! cached copy every tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Static airframe metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AircraftInfo {
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub icao_type: Option<String>,
    pub manufacturer: Option<String>,
    pub registration: Option<String>,
    pub operator: Option<String>,
    pub country: Option<String>,
}

/// Route and timing data for one flight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightInfo {
    pub flight: Option<String>,
    pub origin: Option<String>,
    pub origin_iata: Option<String>,
    pub destination: Option<String>,
    pub destination_iata: Option<String>,
    #[serde(with = "utc_text")]
    pub departure_time_estimated: Option<DateTime<Utc>>,
    #[serde(with = "utc_text")]
    pub departure_time_actual: Option<DateTime<Utc>>,
    #[serde(with = "utc_text")]
    pub takeoff_time_estimated: Option<DateTime<Utc>>,
    #[serde(with = "utc_text")]
    pub takeoff_time_actual: Option<DateTime<Utc>>,
    #[serde(with = "utc_text")]
    pub landing_time_estimated: Option<DateTime<Utc>>,
    #[serde(with = "utc_text")]
    pub landing_time_actual: Option<DateTime<Utc>>,
    #[serde(with = "utc_text")]
    pub arrival_time_estimated: Option<DateTime<Utc>>,
    #[serde(with = "utc_text")]
    pub arrival_time_actual: Option<DateTime<Utc>>,
    pub distance_elapsed_nm: Option<f64>,
    pub distance_remaining_nm: Option<f64>,
}

impl FlightInfo {
    /// Whole minutes until the estimated landing, truncated toward zero.
    ///
    /// Negative once the estimate has passed.
    pub fn eta_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        let landing = self.landing_time_estimated?;
        Some((landing - now).num_seconds() / 60)
    }

    /// Share of the scheduled flight time already flown, clamped to 0..=100.
    ///
    /// Measured from actual takeoff to estimated gate arrival.
    pub fn percent_complete(&self, now: DateTime<Utc>) -> Option<f64> {
        let takeoff = self.takeoff_time_actual?;
        let arrival = self.arrival_time_estimated?;
        let total = (arrival - takeoff).num_milliseconds() as f64;
        if total <= 0.0 {
            return None;
        }
        let elapsed = (now - takeoff).num_milliseconds() as f64;
        Some((elapsed / total * 100.0).clamp(0.0, 100.0))
    }

    /// Progress by distance flown, 0 when either distance is missing or zero.
    pub fn flight_progress(&self) -> f64 {
        match (self.distance_elapsed_nm, self.distance_remaining_nm) {
            (Some(elapsed), Some(remaining)) if elapsed != 0.0 && remaining != 0.0 => {
                let total = elapsed + remaining;
                if total > 0.0 {
                    100.0 - remaining / total * 100.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Operator fallback
// ---------------------------------------------------------------------------

/// Airline ICAO prefixes → operator name.
const AIRLINE_PREFIXES: &[(&str, &str)] = &[
    ("ACA", "Air Canada"),
    ("ROU", "Air Canada Rouge"),
    ("JZA", "Jazz Aviation"),
    ("POE", "Porter Airlines"),
    ("WJA", "WestJet"),
    ("WEN", "WestJet Encore"),
    ("TSC", "Air Transat"),
    ("FLE", "Flair Airlines"),
    ("SWG", "Sunwing Airlines"),
    ("AAL", "American Airlines"),
    ("DAL", "Delta Air Lines"),
    ("UAL", "United Airlines"),
    ("SKW", "SkyWest Airlines"),
    ("RPA", "Republic Airways"),
    ("ENY", "Envoy Air"),
    ("FDX", "FedEx"),
    ("UPS", "UPS"),
    ("BAW", "British Airways"),
    ("DLH", "Lufthansa"),
    ("AFR", "Air France"),
];

/// Look up operator name from callsign prefix.
pub fn lookup_operator(callsign: &str) -> Option<&'static str> {
    if callsign.len() < 3 {
        return None;
    }
    let prefix = callsign.get(..3)?.to_ascii_uppercase();
    AIRLINE_PREFIXES
        .iter()
        .find(|(p, _)| *p == prefix.as_str())
        .map(|(_, name)| *name)
}

impl AircraftInfo {
    /// Fill `operator` from the callsign prefix when the registry had none.
    pub fn with_operator_fallback(mut self, callsign: Option<&str>) -> Self {
        if self.operator.is_none() {
            self.operator = callsign.and_then(lookup_operator).map(str::to_string);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Timestamp text format
// ---------------------------------------------------------------------------

/// `Option<DateTime<Utc>>` as `"YYYY-MM-DD HH:MM:SS UTC"` or `null`.
pub mod utc_text {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => s.serialize_str(&dt.format(FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let text: Option<String> = Option::deserialize(d)?;
        match text {
            None => Ok(None),
            Some(t) => NaiveDateTime::parse_from_str(&t, FORMAT)
                .map(|n| Some(n.and_utc()))
                .map_err(serde::de::Error::custom),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 20, h, m, 0).unwrap()
    }

    #[test]
    fn test_eta_minutes() {
        let info = FlightInfo {
            landing_time_estimated: Some(t(18, 30)),
            ..Default::default()
        };
        assert_eq!(info.eta_minutes(t(18, 0)), Some(30));
        // 29m59s truncates to 29
        assert_eq!(info.eta_minutes(t(18, 0) + Duration::seconds(1)), Some(29));
        assert_eq!(info.eta_minutes(t(18, 40)), Some(-10));
        assert_eq!(FlightInfo::default().eta_minutes(t(18, 0)), None);
    }

    #[test]
    fn test_percent_complete() {
        let info = FlightInfo {
            takeoff_time_actual: Some(t(16, 0)),
            arrival_time_estimated: Some(t(18, 0)),
            ..Default::default()
        };
        assert_eq!(info.percent_complete(t(17, 0)), Some(50.0));
        assert_eq!(info.percent_complete(t(15, 0)), Some(0.0));
        assert_eq!(info.percent_complete(t(19, 0)), Some(100.0));
    }

    #[test]
    fn test_percent_complete_degenerate() {
        let info = FlightInfo {
            takeoff_time_actual: Some(t(18, 0)),
            arrival_time_estimated: Some(t(18, 0)),
            ..Default::default()
        };
        assert_eq!(info.percent_complete(t(18, 0)), None);
    }

    #[test]
    fn test_flight_progress() {
        let info = FlightInfo {
            distance_elapsed_nm: Some(300.0),
            distance_remaining_nm: Some(100.0),
            ..Default::default()
        };
        assert_eq!(info.flight_progress(), 75.0);
    }

    #[test]
    fn test_flight_progress_missing() {
        let info = FlightInfo {
            distance_elapsed_nm: Some(300.0),
            distance_remaining_nm: None,
            ..Default::default()
        };
        assert_eq!(info.flight_progress(), 0.0);
        let landed = FlightInfo {
            distance_elapsed_nm: Some(300.0),
            distance_remaining_nm: Some(0.0),
            ..Default::default()
        };
        assert_eq!(landed.flight_progress(), 0.0);
    }

    #[test]
    fn test_lookup_operator() {
        assert_eq!(lookup_operator("ACA857"), Some("Air Canada"));
        assert_eq!(lookup_operator("poe201"), Some("Porter Airlines"));
        assert_eq!(lookup_operator("XYZ999"), None);
        assert_eq!(lookup_operator("AC"), None);
    }

    #[test]
    fn test_operator_fallback_keeps_registry_value() {
        let info = AircraftInfo {
            operator: Some("Registered Owner Ltd".into()),
            ..Default::default()
        };
        let info = info.with_operator_fallback(Some("WJA100"));
        assert_eq!(info.operator.as_deref(), Some("Registered Owner Ltd"));

        let blank = AircraftInfo::default().with_operator_fallback(Some("WJA100"));
        assert_eq!(blank.operator.as_deref(), Some("WestJet"));
    }

    #[test]
    fn test_flight_info_time_format() {
        let info = FlightInfo {
            takeoff_time_actual: Some(t(16, 5)),
            ..Default::default()
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["takeoff_time_actual"], "2025-06-20 16:05:00 UTC");
        assert!(json["landing_time_estimated"].is_null());

        let back: FlightInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, info);
    }
}
