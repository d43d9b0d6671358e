//! Delivery SLA configuration
//!
//! Loaded from the settings service once per fetch interval; read-only
//! at evaluation time. Changes take effect on the next fetch, no
//! hot-reload guarantee.

use serde::{Deserialize, Serialize};

/// Default delivery target when the settings service has no value.
pub const DEFAULT_TARGET_MINUTES: f64 = 45.0;

/// Traffic-light status used by clients to color the countdown UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLight {
    Green,
    Yellow,
    Red,
}

/// Per-tenant delivery SLA settings.
///
/// Thresholds are minutes of *remaining* time. When not explicitly
/// configured, the yellow mark opens the last 20% of the target window
/// (i.e. at 80% elapsed) and the red mark halves that again (90%
/// elapsed); past the target everything is red regardless.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlaSettings {
    pub target_minutes: f64,
    #[serde(
        default,
        alias = "yellow_threshold",
        skip_serializing_if = "Option::is_none"
    )]
    pub yellow_threshold_minutes: Option<f64>,
    #[serde(
        default,
        alias = "red_threshold",
        skip_serializing_if = "Option::is_none"
    )]
    pub red_threshold_minutes: Option<f64>,
}

impl SlaSettings {
    pub fn with_target(target_minutes: f64) -> Self {
        Self {
            target_minutes,
            yellow_threshold_minutes: None,
            red_threshold_minutes: None,
        }
    }

    /// Remaining minutes at or below which the countdown turns yellow.
    pub fn yellow_threshold(&self) -> f64 {
        self.yellow_threshold_minutes
            .unwrap_or(self.target_minutes * 0.2)
    }

    /// Remaining minutes at or below which the countdown turns red.
    pub fn red_threshold(&self) -> f64 {
        self.red_threshold_minutes
            .unwrap_or_else(|| self.yellow_threshold() * 0.5)
    }
}

impl Default for SlaSettings {
    fn default() -> Self {
        Self::with_target(DEFAULT_TARGET_MINUTES)
    }
}
