//! Keyed table of tracked aircraft.
//!
//! Pure logic, no I/O. The loop upserts every snapshot of a tick, then
//! prunes once. Distances are recomputed on every upsert; enrichment caches
//! and the alerted flag survive across ticks until the aircraft is evicted.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::enrich::{AircraftInfo, FlightInfo};
use crate::feed::AircraftSnapshot;
use crate::geo;
use crate::types::LatLon;

/// Aircraft not seen for longer than this many minutes are evicted.
pub const PRUNE_WINDOW_MINUTES: i64 = 15;

// ---------------------------------------------------------------------------
// Aircraft state
// ---------------------------------------------------------------------------

/// Latest known state for a single aircraft.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedAircraft {
    pub hex: String,
    pub callsign: Option<String>,

    // Kinematics
    pub position: LatLon,
    pub altitude_ft: Option<i32>,
    pub ground_speed_kts: Option<f64>,
    pub heading_deg: Option<f64>,

    // Derived, recomputed every upsert
    pub distance_km: f64,
    pub closest_approach_km: Option<f64>,

    // Enrichment caches
    pub registry: Option<AircraftInfo>,
    pub schedule: Option<FlightInfo>,

    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub alerted: bool,
}

impl TrackedAircraft {
    fn new(snap: &AircraftSnapshot, reference: LatLon, now: DateTime<Utc>) -> Self {
        let mut ac = TrackedAircraft {
            hex: snap.hex.clone(),
            callsign: None,
            position: snap.position,
            altitude_ft: None,
            ground_speed_kts: None,
            heading_deg: None,
            distance_km: 0.0,
            closest_approach_km: None,
            registry: None,
            schedule: None,
            first_seen: now,
            last_seen: now,
            alerted: false,
        };
        ac.apply(snap, reference, now);
        ac
    }

    fn apply(&mut self, snap: &AircraftSnapshot, reference: LatLon, now: DateTime<Utc>) {
        self.callsign = snap.callsign.clone();
        self.position = snap.position;
        self.altitude_ft = snap.altitude_ft;
        self.ground_speed_kts = snap.ground_speed_kts;
        self.heading_deg = snap.heading_deg;
        self.distance_km = geo::distance_km(reference, snap.position);
        self.closest_approach_km =
            geo::closest_approach_km(snap.position, snap.heading_deg, reference);
        self.last_seen = now;
    }

    /// Flight identifier used for alerts and schedule lookups.
    pub fn flight(&self) -> Option<&str> {
        self.callsign.as_deref()
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_seen
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > Duration::minutes(PRUNE_WINDOW_MINUTES)
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// All aircraft currently tracked, keyed by identity code.
pub struct AircraftTable {
    reference: LatLon,
    aircraft: HashMap<String, TrackedAircraft>,
}

impl AircraftTable {
    pub fn new(reference: LatLon) -> Self {
        AircraftTable {
            reference,
            aircraft: HashMap::new(),
        }
    }

    pub fn reference(&self) -> LatLon {
        self.reference
    }

    /// Insert or refresh one aircraft. Returns `true` on first sighting.
    pub fn upsert(&mut self, snap: &AircraftSnapshot, now: DateTime<Utc>) -> bool {
        match self.aircraft.get_mut(&snap.hex) {
            Some(ac) => {
                ac.apply(snap, self.reference, now);
                false
            }
            None => {
                let ac = TrackedAircraft::new(snap, self.reference, now);
                self.aircraft.insert(snap.hex.clone(), ac);
                true
            }
        }
    }

    /// Evict aircraft missing from this tick and silent past the prune window.
    ///
    /// Returns the evicted identity codes.
    pub fn prune(&mut self, seen: &HashSet<String>, now: DateTime<Utc>) -> Vec<String> {
        let evicted: Vec<String> = self
            .aircraft
            .iter()
            .filter(|(hex, ac)| !seen.contains(*hex) && ac.is_stale(now))
            .map(|(hex, _)| hex.clone())
            .collect();
        for hex in &evicted {
            self.aircraft.remove(hex);
        }
        evicted
    }

    pub fn attach_registry(&mut self, hex: &str, info: AircraftInfo) {
        if let Some(ac) = self.aircraft.get_mut(hex) {
            ac.registry = Some(info);
        }
    }

    pub fn attach_schedule(&mut self, hex: &str, info: FlightInfo) {
        if let Some(ac) = self.aircraft.get_mut(hex) {
            ac.schedule = Some(info);
        }
    }

    pub fn mark_alerted(&mut self, hex: &str) {
        if let Some(ac) = self.aircraft.get_mut(hex) {
            ac.alerted = true;
        }
    }

    pub fn get(&self, hex: &str) -> Option<&TrackedAircraft> {
        self.aircraft.get(hex)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedAircraft> {
        self.aircraft.values()
    }

    /// All aircraft sorted by distance to the reference (nearest first).
    pub fn by_distance(&self) -> Vec<&TrackedAircraft> {
        let mut list: Vec<_> = self.aircraft.values().collect();
        list.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.hex.cmp(&b.hex))
        });
        list
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
