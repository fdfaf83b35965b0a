//! Shared types and the error enum for overhead-core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors produced by overhead-core.
#[derive(Debug, Error)]
pub enum OverheadError {
    #[error("feed unreadable: {0}")]
    Feed(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("lookup failed: {0}")]
    Lookup(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OverheadError>;

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A point on the Earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        LatLon { lat, lon }
    }
}

/// Default reference point (the spot on the ground alerts are measured from).
pub const DEFAULT_REFERENCE: LatLon = LatLon::new(43.666426, -79.422638);

// ---------------------------------------------------------------------------
// Identity codes
// ---------------------------------------------------------------------------

/// Normalise a transponder identity code: trimmed, lowercase hex.
///
/// Returns `None` for empty strings.
pub fn normalize_hex(code: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() {
        return None;
    }
    Some(code.to_ascii_lowercase())
}

/// Normalise a callsign: trimmed, `None` when blank.
pub fn normalize_callsign(callsign: &str) -> Option<String> {
    let cs = callsign.trim();
    if cs.is_empty() {
        None
    } else {
        Some(cs.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
