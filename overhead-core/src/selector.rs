//! Alert eligibility and subject selection.
//!
//! An aircraft qualifies when it carries a flight identifier, is close to
//! the reference, and its projected track passes nearly overhead. The nearest
//! qualifying aircraft is the single alert subject for the tick.

use std::collections::HashSet;

use crate::table::{AircraftTable, TrackedAircraft};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_MAX_DISTANCE_KM: f64 = 9.0;
pub const DEFAULT_MAX_CLOSEST_APPROACH_KM: f64 = 1.4;

/// Identity codes never alerted on (test transponders, known ground vehicles).
pub const DEFAULT_BLACKLIST: &[&str] = &["c06032", "abcd12", "123abc"];

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// Thresholds for alert eligibility.
#[derive(Debug, Clone)]
pub struct AlertCriteria {
    pub max_distance_km: f64,
    pub max_closest_approach_km: f64,
    pub blacklist: HashSet<String>,
}

impl Default for AlertCriteria {
    fn default() -> Self {
        AlertCriteria {
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            max_closest_approach_km: DEFAULT_MAX_CLOSEST_APPROACH_KM,
            blacklist: DEFAULT_BLACKLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AlertCriteria {
    /// Projected track passes within the overhead threshold.
    pub fn is_closing(&self, ac: &TrackedAircraft) -> bool {
        matches!(ac.closest_approach_km, Some(ca) if ca <= self.max_closest_approach_km)
            && !self.blacklist.contains(&ac.hex)
    }

    pub fn is_eligible(&self, ac: &TrackedAircraft) -> bool {
        let has_flight = ac.flight().is_some_and(|f| !f.trim().is_empty());
        has_flight && ac.distance_km <= self.max_distance_km && self.is_closing(ac)
    }

    /// Nearest eligible aircraft, ties broken by identity code.
    pub fn select<'a>(&self, table: &'a AircraftTable) -> Option<&'a TrackedAircraft> {
        table
            .iter()
            .filter(|ac| self.is_eligible(ac))
            .min_by(|a, b| {
                a.distance_km
                    .total_cmp(&b.distance_km)
                    .then_with(|| a.hex.cmp(&b.hex))
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
