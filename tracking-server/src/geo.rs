//! Geodesic math for delivery tracking
//!
//! Pure, deterministic functions: great-circle distance, trailing-window
//! speed estimation and ETA projection. No state, no side effects.
//!
//! The clamp bounds are operationally tuned rather than structurally
//! required, so they live in [`EtaTuning`] and come from config.

use shared::LocationPing;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// How many trailing pings feed the speed estimate.
const SPEED_WINDOW: usize = 3;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<&LocationPing> for GeoPoint {
    fn from(ping: &LocationPing) -> Self {
        Self::new(ping.lat, ping.lng)
    }
}

/// Tunable bounds for speed and ETA estimation.
#[derive(Debug, Clone, Copy)]
pub struct EtaTuning {
    /// Lower speed clamp (walking pace).
    pub min_speed_mps: f64,
    /// Upper speed clamp (fast urban driving) - avoids wild
    /// extrapolation from a single noisy GPS jump.
    pub max_speed_mps: f64,
    /// Assumed speed when no usable estimate exists.
    pub fallback_speed_mps: f64,
    /// ETA floor - prevents a "0 minutes" flash when very close.
    pub min_eta_minutes: f64,
    /// ETA ceiling - prevents multi-hour estimates from destabilizing
    /// the countdown UI.
    pub max_eta_minutes: f64,
}

impl Default for EtaTuning {
    fn default() -> Self {
        Self {
            min_speed_mps: 1.0,
            max_speed_mps: 25.0,
            fallback_speed_mps: 6.0,
            min_eta_minutes: 3.0,
            max_eta_minutes: 45.0,
        }
    }
}

/// Great-circle (haversine) distance in meters between two points.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let sin_d_lat = (d_lat / 2.0).sin();
    let sin_d_lng = (d_lng / 2.0).sin();
    let h = sin_d_lat * sin_d_lat + lat1.cos() * lat2.cos() * sin_d_lng * sin_d_lng;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Average speed over the last up-to-3 pings, in m/s.
///
/// Segments with non-positive or non-finite elapsed time are discarded;
/// the remaining segment speeds are averaged and clamped to
/// `[min_speed, max_speed]`. Returns `None` when no usable segment
/// exists (fewer than 2 pings, or all segments degenerate).
pub fn estimate_speed_mps(pings: &[LocationPing], tuning: &EtaTuning) -> Option<f64> {
    let window = &pings[pings.len().saturating_sub(SPEED_WINDOW)..];
    if window.len() < 2 {
        return None;
    }

    let mut segments = Vec::with_capacity(window.len() - 1);
    for pair in window.windows(2) {
        let dt_ms = pair[1].captured_at - pair[0].captured_at;
        if dt_ms <= 0 {
            continue;
        }
        let d = distance_meters((&pair[0]).into(), (&pair[1]).into());
        let speed = d / (dt_ms as f64 / 1000.0);
        if speed.is_finite() && speed > 0.0 {
            segments.push(speed);
        }
    }

    if segments.is_empty() {
        return None;
    }

    let avg = segments.iter().sum::<f64>() / segments.len() as f64;
    Some(avg.clamp(tuning.min_speed_mps, tuning.max_speed_mps))
}

/// Project an ETA in whole minutes from remaining distance and speed.
///
/// Falls back to `fallback_speed` when the estimate is unavailable or
/// non-positive, clamps to `[min_eta, max_eta]` and always returns at
/// least 1.
pub fn estimate_eta_minutes(distance_m: f64, speed_mps: Option<f64>, tuning: &EtaTuning) -> u32 {
    let dist = if distance_m.is_finite() {
        distance_m.max(0.0)
    } else {
        0.0
    };
    let speed = match speed_mps {
        Some(s) if s.is_finite() && s > 0.0 => s,
        _ => tuning.fallback_speed_mps,
    };
    let minutes = dist / speed / 60.0;
    let clamped = minutes.clamp(tuning.min_eta_minutes, tuning.max_eta_minutes);
    (clamped.round() as u32).max(1)
}
