use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Discrete steering decision for one control cycle.
///
/// The set is closed: every component that maps an action to something else
/// (wheel speeds, counters, log labels) matches exhaustively on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Nothing close enough to react to: drive straight ahead.
    Advance,
    /// Obstacle on the right: veer left.
    TurnLeft,
    /// Obstacle on the left: veer right.
    TurnRight,
    /// Obstacle straight ahead: spin away on the spot.
    EmergencyTurn,
}

impl Action {
    /// Every action, in rule-priority order (lowest priority first).
    pub const ALL: [Action; 4] = [
        Action::Advance,
        Action::TurnLeft,
        Action::TurnRight,
        Action::EmergencyTurn,
    ];

    /// Stable snake_case label, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Advance => "advance",
            Action::TurnLeft => "turn_left",
            Action::TurnRight => "turn_right",
            Action::EmergencyTurn => "emergency_turn",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Left/right wheel speed command handed to the drive collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelSpeeds {
    pub left: f32,
    pub right: f32,
}

impl WheelSpeeds {
    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }
}

/// Closest reading per zone.  Smaller means a nearer obstacle, i.e. more
/// danger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DangerTriple {
    pub left: f32,
    pub center: f32,
    pub right: f32,
}

/// Per-action cycle counters collected by the control loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    pub advance: u64,
    pub turn_left: u64,
    pub turn_right: u64,
    pub emergency_turn: u64,
}

impl ActionCounts {
    pub fn record(&mut self, action: Action) {
        *self.slot_mut(action) += 1;
    }

    pub fn get(&self, action: Action) -> u64 {
        match action {
            Action::Advance => self.advance,
            Action::TurnLeft => self.turn_left,
            Action::TurnRight => self.turn_right,
            Action::EmergencyTurn => self.emergency_turn,
        }
    }

    pub fn total(&self) -> u64 {
        Action::ALL.iter().map(|a| self.get(*a)).sum()
    }

    fn slot_mut(&mut self, action: Action) -> &mut u64 {
        match action {
            Action::Advance => &mut self.advance,
            Action::TurnLeft => &mut self.turn_left,
            Action::TurnRight => &mut self.turn_right,
            Action::EmergencyTurn => &mut self.emergency_turn,
        }
    }
}

/// Why a control run ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The simulation reported it is no longer running.
    SimulationStopped,
    /// The configured cycle limit was reached.
    CycleLimit,
    /// An operator asked for shutdown (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Outcome of one control run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of completed read → decide → actuate cycles.
    pub cycles: u64,
    pub action_counts: ActionCounts,
    pub termination: Termination,
}

/// Error type shared by the decision core, the hardware collaborators and the
/// control loop.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NavError {
    #[error("Invalid Input: expected at least {required} sonar readings, got {actual}")]
    InvalidInput { required: usize, actual: usize },

    #[error("Invalid Input: sonar reading {index} is not a distance ({value})")]
    InvalidReading { index: usize, value: f32 },

    #[error("Configuration Error: {0}")]
    Configuration(String),

    #[error("Collaborator Fault on {component}: {details}")]
    Collaborator { component: String, details: String },
}

impl NavError {
    /// Shorthand for a [`NavError::Collaborator`] fault.
    pub fn collaborator(component: impl Into<String>, details: impl Into<String>) -> Self {
        NavError::Collaborator {
            component: component.into(),
            details: details.into(),
        }
    }

    /// `true` for the input-validation variants.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            NavError::InvalidInput { .. } | NavError::InvalidReading { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serializes_as_snake_case_label() {
        for action in Action::ALL {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
            let back: Action = serde_json::from_str(&json).unwrap();
            assert_eq!(back, action);
        }
    }

    #[test]
    fn action_display_matches_label() {
        assert_eq!(Action::EmergencyTurn.to_string(), "emergency_turn");
        assert_eq!(Action::TurnLeft.to_string(), "turn_left");
    }

    #[test]
    fn unknown_action_label_is_rejected() {
        let result: Result<Action, _> = serde_json::from_str("\"reverse\"");
        assert!(result.is_err());
    }

    #[test]
    fn action_counts_record_and_total() {
        let mut counts = ActionCounts::default();
        counts.record(Action::Advance);
        counts.record(Action::Advance);
        counts.record(Action::EmergencyTurn);
        assert_eq!(counts.get(Action::Advance), 2);
        assert_eq!(counts.get(Action::EmergencyTurn), 1);
        assert_eq!(counts.get(Action::TurnLeft), 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn run_summary_roundtrip() {
        let summary = RunSummary {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            cycles: 12,
            action_counts: ActionCounts {
                advance: 10,
                turn_left: 1,
                turn_right: 0,
                emergency_turn: 1,
            },
            termination: Termination::CycleLimit,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"cycle_limit\""));
        let back: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.run_id, summary.run_id);
        assert_eq!(back.action_counts, summary.action_counts);
        assert_eq!(back.termination, Termination::CycleLimit);
    }

    #[test]
    fn nav_error_display() {
        let err = NavError::InvalidInput {
            required: 8,
            actual: 5,
        };
        assert!(err.to_string().contains("Invalid Input"));
        assert!(err.to_string().contains('8'));
        assert!(err.is_invalid_input());

        let err2 = NavError::collaborator("sonar", "connection lost");
        assert!(err2.to_string().contains("sonar"));
        assert!(!err2.is_invalid_input());
    }
}
