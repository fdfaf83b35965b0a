//! Feed parsing: dump1090-style `aircraft.json` into typed snapshots.
//!
//! The feed is loosely typed (`alt_baro` may be `"ground"`, `track` may be
//! missing or a string). Everything is validated here so the rest of the
//! crate only sees `AircraftSnapshot`.

use serde::Deserialize;
use serde_json::Value;

use crate::types::{normalize_callsign, normalize_hex, LatLon, OverheadError, Result};

/// One aircraft report from a single feed read. Not retained across ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct AircraftSnapshot {
    pub hex: String,
    pub position: LatLon,
    pub altitude_ft: Option<i32>,
    pub ground_speed_kts: Option<f64>,
    pub heading_deg: Option<f64>,
    pub callsign: Option<String>,
}

#[derive(Deserialize)]
struct RawFeed {
    #[serde(default)]
    aircraft: Vec<Value>,
}

/// Every field loosely typed so one odd entry can't fail the document.
#[derive(Deserialize)]
struct RawAircraft {
    hex: Option<Value>,
    flight: Option<Value>,
    lat: Option<Value>,
    lon: Option<Value>,
    alt_baro: Option<Value>,
    gs: Option<Value>,
    track: Option<Value>,
}

/// Parse a feed document.
///
/// Errors only when the document itself is unreadable; individual entries
/// that aren't objects, or lack an identity code or a full position, are
/// skipped.
pub fn parse_feed(text: &str) -> Result<Vec<AircraftSnapshot>> {
    let raw: RawFeed =
        serde_json::from_str(text).map_err(|e| OverheadError::Feed(e.to_string()))?;

    Ok(raw
        .aircraft
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<RawAircraft>(entry).ok())
        .filter_map(snapshot)
        .collect())
}

fn snapshot(raw: RawAircraft) -> Option<AircraftSnapshot> {
    let hex = normalize_hex(raw.hex.as_ref()?.as_str()?)?;
    let lat = number_value(raw.lat.as_ref()?)?;
    let lon = number_value(raw.lon.as_ref()?)?;

    Some(AircraftSnapshot {
        hex,
        position: LatLon::new(lat, lon),
        altitude_ft: raw.alt_baro.as_ref().and_then(altitude_value),
        ground_speed_kts: raw.gs.as_ref().and_then(number_value),
        heading_deg: raw.track.as_ref().and_then(number_value),
        callsign: raw
            .flight
            .as_ref()
            .and_then(Value::as_str)
            .and_then(normalize_callsign),
    })
}

/// Numeric JSON value, or a string holding a number. Anything else is absent.
fn number_value(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn altitude_value(v: &Value) -> Option<i32> {
    if v.as_str() == Some("ground") {
        return Some(0);
    }
    number_value(v).map(|ft| ft.round() as i32)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
