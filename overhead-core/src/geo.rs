//! Great-circle distance and closest-approach prediction.
//!
//! Closest approach projects the aircraft 100 km ahead along its track and
//! measures the reference point against that segment in plain degrees, scaled
//! by 111 km per degree. The planar step is only valid for short segments near
//! the reference point, which is the only place the result is used.

use crate::types::LatLon;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// How far ahead along the track the flight path is projected.
pub const LOOKAHEAD_KM: f64 = 100.0;

/// Kilometres per degree for the small-region planar approximation.
pub const KM_PER_DEGREE: f64 = 111.0;

// ---------------------------------------------------------------------------
// Haversine
// ---------------------------------------------------------------------------

/// Great-circle distance in kilometres.
pub fn distance_km(a: LatLon, b: LatLon) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Point reached by travelling `km` from `start` on initial bearing `bearing_deg`.
pub fn destination(start: LatLon, bearing_deg: f64, km: f64) -> LatLon {
    let brg = bearing_deg.to_radians();
    let lat1 = start.lat.to_radians();
    let lon1 = start.lon.to_radians();
    let ang = km / EARTH_RADIUS_KM;

    let lat2 = (lat1.sin() * ang.cos() + lat1.cos() * ang.sin() * brg.cos()).asin();
    let lon2 = lon1
        + (brg.sin() * ang.sin() * lat1.cos()).atan2(ang.cos() - lat1.sin() * lat2.sin());

    LatLon::new(lat2.to_degrees(), lon2.to_degrees())
}

// ---------------------------------------------------------------------------
// Closest approach
// ---------------------------------------------------------------------------

/// Predicted closest approach (km) of a track to `reference`.
///
/// `None` when the heading is missing or not a finite number.
pub fn closest_approach_km(position: LatLon, heading_deg: Option<f64>, reference: LatLon) -> Option<f64> {
    let heading = heading_deg.filter(|h| h.is_finite())?;
    let ahead = destination(position, heading, LOOKAHEAD_KM);
    let deg = point_segment_distance(
        (reference.lat, reference.lon),
        (position.lat, position.lon),
        (ahead.lat, ahead.lon),
    );
    Some(deg * KM_PER_DEGREE)
}

/// Euclidean distance from `p` to the segment `a`-`b` in coordinate units.
fn point_segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return ((p.0 - a.0).powi(2) + (p.1 - a.1).powi(2)).sqrt();
    }
    let t = (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0);
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
