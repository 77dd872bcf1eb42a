//! [`ReactiveController`] – the per-cycle decision pipeline.
//!
//! `readings → ZoneLayout::aggregate → Thresholds::evaluate →
//! SpeedProfile::wheel_speeds`.  The controller holds only configuration, so
//! one instance can serve any number of cycles (or threads) without carrying
//! state from one decision into the next.

use serde::{Deserialize, Serialize};
use sonarnav_types::{Action, DangerTriple, NavError, WheelSpeeds};
use tracing::{debug, instrument};

use crate::rules::{SpeedProfile, Thresholds};
use crate::zones::ZoneLayout;

/// Everything needed to configure a [`ReactiveController`].
///
/// Deserializes from the `[controller]` table of the config file; missing
/// fields fall back to the P3-DX defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerParams {
    pub thresholds: Thresholds,
    pub speeds: SpeedProfile,
    pub zones: ZoneLayout,
}

impl ControllerParams {
    pub fn validate(&self) -> Result<(), NavError> {
        self.thresholds.validate()?;
        self.speeds.validate()?;
        self.zones.validate()
    }
}

/// Result of one decision, kept together for logging and bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub danger: DangerTriple,
    pub action: Action,
    pub speeds: WheelSpeeds,
}

/// Stateless obstacle-avoidance controller.
#[derive(Debug, Clone, Default)]
pub struct ReactiveController {
    params: ControllerParams,
}

impl ReactiveController {
    /// Build a controller from validated parameters.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Configuration`] if any part of `params` is
    /// inconsistent.
    pub fn new(params: ControllerParams) -> Result<Self, NavError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Number of readings a sweep must contain.
    pub fn required_readings(&self) -> usize {
        self.params.zones.required_len()
    }

    pub fn danger_zones(&self, readings: &[f32]) -> Result<DangerTriple, NavError> {
        self.params.zones.aggregate(readings)
    }

    pub fn evaluate(&self, danger: &DangerTriple) -> Action {
        self.params.thresholds.evaluate(danger)
    }

    pub fn wheel_speeds(&self, action: Action) -> WheelSpeeds {
        self.params.speeds.wheel_speeds(action)
    }

    /// Run the full pipeline on one sonar sweep.
    ///
    /// # Errors
    ///
    /// Propagates [`NavError::InvalidInput`] / [`NavError::InvalidReading`]
    /// from the zone aggregation; nothing downstream can fail.
    #[instrument(level = "trace", skip_all, fields(readings = readings.len()))]
    pub fn compute_movement(&self, readings: &[f32]) -> Result<Decision, NavError> {
        let danger = self.danger_zones(readings)?;
        let action = self.evaluate(&danger);
        let speeds = self.wheel_speeds(action);
        debug!(
            left = danger.left,
            center = danger.center,
            right = danger.right,
            %action,
            left_speed = speeds.left,
            right_speed = speeds.right,
            "decision"
        );
        Ok(Decision {
            danger,
            action,
            speeds,
        })
    }
}
