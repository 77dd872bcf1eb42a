//! Threshold rules: danger levels → [`Action`] → [`WheelSpeeds`].
//!
//! [`Thresholds::evaluate`] applies the rules in strict priority order; the
//! first rule that matches wins:
//!
//! 1. `center < very_close` → [`Action::EmergencyTurn`]
//! 2. `left < close` → [`Action::TurnRight`]
//! 3. `right < close` → [`Action::TurnLeft`]
//! 4. otherwise → [`Action::Advance`]
//!
//! Comparisons are strict, so a reading exactly on a threshold falls through
//! to the next rule.  There is no blending between rules.
//!
//! [`SpeedProfile::wheel_speeds`] maps every action to a fixed speed pair.

use serde::{Deserialize, Serialize};
use sonarnav_types::{Action, DangerTriple, NavError, WheelSpeeds};

// ────────────────────────────────────────────────────────────────────────────
// Constants
// ────────────────────────────────────────────────────────────────────────────

/// Center readings below this trigger an emergency turn.
pub const VERY_CLOSE: f32 = 0.8;
/// Side readings below this trigger a turn away from that side.
pub const CLOSE: f32 = 0.5;
/// Not referenced by any rule yet.  Kept so a graduated slow-down rule can be
/// added without changing the config format.
pub const SAFE: f32 = 0.3;

pub const NORMAL_SPEED: f32 = 1.0;
pub const TURN_SPEED: f32 = 0.6;
pub const SLOW_SPEED: f32 = 0.4;

/// Largest wheel speed magnitude a profile may command.
pub const MAX_SPEED: f32 = 1.0;

// ────────────────────────────────────────────────────────────────────────────
// Thresholds
// ────────────────────────────────────────────────────────────────────────────

/// Distance thresholds for the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub very_close: f32,
    pub close: f32,
    pub safe: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            very_close: VERY_CLOSE,
            close: CLOSE,
            safe: SAFE,
        }
    }
}

impl Thresholds {
    /// Check that every threshold is a finite, non-negative distance and that
    /// `very_close >= close >= safe`.
    pub fn validate(&self) -> Result<(), NavError> {
        for (name, value) in [
            ("very_close", self.very_close),
            ("close", self.close),
            ("safe", self.safe),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(NavError::Configuration(format!(
                    "threshold {name} must be a finite non-negative distance, got {value}"
                )));
            }
        }
        if self.very_close < self.close || self.close < self.safe {
            return Err(NavError::Configuration(format!(
                "thresholds must satisfy very_close >= close >= safe, got {} / {} / {}",
                self.very_close, self.close, self.safe
            )));
        }
        Ok(())
    }

    /// Pick the action for `danger`.  Pure; identical input always yields the
    /// identical action.
    pub fn evaluate(&self, danger: &DangerTriple) -> Action {
        if danger.center < self.very_close {
            Action::EmergencyTurn
        } else if danger.left < self.close {
            Action::TurnRight
        } else if danger.right < self.close {
            Action::TurnLeft
        } else {
            Action::Advance
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Speed profile
// ────────────────────────────────────────────────────────────────────────────

/// The three speed levels the action table is built from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedProfile {
    pub normal: f32,
    pub turn: f32,
    pub slow: f32,
}

impl Default for SpeedProfile {
    fn default() -> Self {
        Self {
            normal: NORMAL_SPEED,
            turn: TURN_SPEED,
            slow: SLOW_SPEED,
        }
    }
}

impl SpeedProfile {
    /// Check that every speed is finite and within `±MAX_SPEED`.
    pub fn validate(&self) -> Result<(), NavError> {
        for (name, value) in [
            ("normal", self.normal),
            ("turn", self.turn),
            ("slow", self.slow),
        ] {
            if !value.is_finite() || value.abs() > MAX_SPEED {
                return Err(NavError::Configuration(format!(
                    "speed {name} must be finite and within ±{MAX_SPEED}, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Wheel speeds for `action`.
    ///
    /// | Action | left | right |
    /// |---|---|---|
    /// | advance | `normal` | `normal` |
    /// | turn_left | `slow` | `turn` |
    /// | turn_right | `turn` | `slow` |
    /// | emergency_turn | `-slow` | `turn` |
    pub fn wheel_speeds(&self, action: Action) -> WheelSpeeds {
        match action {
            Action::Advance => WheelSpeeds::new(self.normal, self.normal),
            Action::TurnLeft => WheelSpeeds::new(self.slow, self.turn),
            Action::TurnRight => WheelSpeeds::new(self.turn, self.slow),
            Action::EmergencyTurn => WheelSpeeds::new(-self.slow, self.turn),
        }
    }
}
