//! SLA evaluation - countdown traffic light
//!
//! Derives a `green | yellow | red` status from elapsed/remaining time
//! against the configured delivery target. Pure and synchronous; the
//! periodic re-evaluation loop lives in [`monitor`].

pub mod monitor;

use chrono::{DateTime, Utc};
use shared::models::{Order, SlaSettings, TrafficLight};
use shared::util::millis_to_minutes_ceil;

pub use monitor::SlaMonitor;

/// One evaluation result, pushed to order rooms and returned by the
/// tracking bootstrap endpoint.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaSnapshot {
    pub color: TrafficLight,
    pub elapsed_minutes: i64,
    pub remaining_minutes: i64,
}

/// Core rule: red once the target is spent or the remaining window is
/// inside the red threshold, yellow inside the yellow threshold, green
/// otherwise.
pub fn evaluate(elapsed_minutes: f64, remaining_minutes: f64, settings: &SlaSettings) -> TrafficLight {
    if elapsed_minutes >= settings.target_minutes || remaining_minutes <= settings.red_threshold() {
        TrafficLight::Red
    } else if remaining_minutes <= settings.yellow_threshold() {
        TrafficLight::Yellow
    } else {
        TrafficLight::Green
    }
}

/// Live countdown for an active order.
///
/// The clock starts at `paid_at`, falling back to `created_at` for
/// unpaid orders.
pub fn evaluate_live(order: &Order, now: DateTime<Utc>, settings: &SlaSettings) -> SlaSnapshot {
    let start_ms = order.sla_clock_start().timestamp_millis();
    let now_ms = now.timestamp_millis();
    let elapsed = millis_to_minutes_ceil(now_ms - start_ms);

    let deadline_ms = start_ms + (settings.target_minutes * 60_000.0) as i64;
    let remaining = millis_to_minutes_ceil(deadline_ms - now_ms);

    SlaSnapshot {
        color: evaluate(elapsed as f64, remaining as f64, settings),
        elapsed_minutes: elapsed,
        remaining_minutes: remaining,
    }
}

/// One-shot evaluation for a delivered order: total elapsed time
/// between payment and delivery instead of a live countdown.
///
/// Returns `None` until both timestamps exist.
pub fn evaluate_final(order: &Order, settings: &SlaSettings) -> Option<SlaSnapshot> {
    let delivered = order.delivered_at?;
    let start_ms = order.sla_clock_start().timestamp_millis();
    let elapsed = millis_to_minutes_ceil(delivered.timestamp_millis() - start_ms);
    let remaining = (settings.target_minutes as i64 - elapsed).max(0);

    Some(SlaSnapshot {
        color: evaluate(elapsed as f64, remaining as f64, settings),
        elapsed_minutes: elapsed,
        remaining_minutes: remaining,
    })
}
