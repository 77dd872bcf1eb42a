//! Scripted stub collaborators for tests and CI runs without a simulator.
//!
//! - [`ScriptedSonar`] replays a fixed list of sweeps (or failures).
//! - [`RecordingDrive`] stores every wheel command it receives.
//! - [`ScriptedSimulation`] reports "running" for a fixed number of polls and
//!   counts `start` / `stop` calls.
//!
//! For a world that actually moves, see [`SimSession`][crate::world::SimSession].
//!
//! # Example
//!
//! ```rust
//! use sonarnav_hal::sim::{RecordingDrive, ScriptedSonar};
//! use sonarnav_hal::{SonarArray, WheelDrive};
//! use sonarnav_types::WheelSpeeds;
//!
//! let mut sonar = ScriptedSonar::new("sonar").with_frame(vec![1.0; 8]);
//! let mut drive = RecordingDrive::new("base");
//!
//! assert_eq!(sonar.get_sensor_readings().unwrap().len(), 8);
//! drive.set_wheel_speeds(WheelSpeeds::new(1.0, 1.0)).unwrap();
//! assert_eq!(drive.commands().len(), 1);
//! ```

use std::cell::Cell;
use std::collections::VecDeque;

use sonarnav_types::{NavError, WheelSpeeds};

use crate::drive::WheelDrive;
use crate::simulation::Simulation;
use crate::sonar::SonarArray;

// ────────────────────────────────────────────────────────────────────────────
// Scripted sonar
// ────────────────────────────────────────────────────────────────────────────

/// A sonar ring that replays queued sweeps in order.
///
/// Once the script is exhausted every further read fails with
/// [`NavError::Collaborator`].
pub struct ScriptedSonar {
    id: String,
    script: VecDeque<Result<Vec<f32>, NavError>>,
    reads: usize,
}

impl ScriptedSonar {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            script: VecDeque::new(),
            reads: 0,
        }
    }

    /// Queue one sweep.
    pub fn with_frame(mut self, readings: Vec<f32>) -> Self {
        self.script.push_back(Ok(readings));
        self
    }

    /// Queue `count` copies of the same sweep.
    pub fn with_repeated_frame(mut self, readings: Vec<f32>, count: usize) -> Self {
        for _ in 0..count {
            self.script.push_back(Ok(readings.clone()));
        }
        self
    }

    /// Queue a read failure.
    pub fn with_failure(mut self, details: impl Into<String>) -> Self {
        let err = NavError::collaborator(self.id.clone(), details);
        self.script.push_back(Err(err));
        self
    }

    /// Number of reads served so far, failures included.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl SonarArray for ScriptedSonar {
    fn id(&self) -> &str {
        &self.id
    }

    fn get_sensor_readings(&mut self) -> Result<Vec<f32>, NavError> {
        self.reads += 1;
        self.script.pop_front().unwrap_or_else(|| {
            Err(NavError::collaborator(self.id.clone(), "sonar script exhausted"))
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Recording drive
// ────────────────────────────────────────────────────────────────────────────

/// A drive base that records every command.  Optionally fails on the n-th
/// command (0-based) to exercise actuation-error paths.
pub struct RecordingDrive {
    id: String,
    commands: Vec<WheelSpeeds>,
    fail_at: Option<usize>,
    attempts: usize,
}

impl RecordingDrive {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            commands: Vec::new(),
            fail_at: None,
            attempts: 0,
        }
    }

    /// Make the `index`-th command (0-based) fail instead of being recorded.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Every successfully applied command, oldest first.
    pub fn commands(&self) -> &[WheelSpeeds] {
        &self.commands
    }
}

impl WheelDrive for RecordingDrive {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_wheel_speeds(&mut self, speeds: WheelSpeeds) -> Result<(), NavError> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.fail_at == Some(attempt) {
            return Err(NavError::collaborator(
                self.id.clone(),
                format!("motor controller rejected command #{attempt}"),
            ));
        }
        self.commands.push(speeds);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scripted lifecycle
// ────────────────────────────────────────────────────────────────────────────

/// A simulation lifecycle that stays running for `polls` calls to
/// [`is_running`][Simulation::is_running] after `start`.
///
/// Pass `u64::MAX` for a simulation that never stops on its own.
pub struct ScriptedSimulation {
    polls_left: Cell<u64>,
    started: bool,
    stopped: bool,
    fail_start: bool,
    starts: usize,
    stops: usize,
}

impl ScriptedSimulation {
    pub fn new(polls: u64) -> Self {
        Self {
            polls_left: Cell::new(polls),
            started: false,
            stopped: false,
            fail_start: false,
            starts: 0,
            stops: 0,
        }
    }

    /// Make `start` fail, e.g. to model an unreachable simulator.
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn starts(&self) -> usize {
        self.starts
    }

    pub fn stops(&self) -> usize {
        self.stops
    }
}

impl Simulation for ScriptedSimulation {
    fn start(&mut self) -> Result<(), NavError> {
        self.starts += 1;
        if self.fail_start {
            return Err(NavError::collaborator("simulation", "simulator not reachable"));
        }
        self.started = true;
        Ok(())
    }

    fn is_running(&self) -> bool {
        if !self.started || self.stopped {
            return false;
        }
        let left = self.polls_left.get();
        if left == 0 {
            return false;
        }
        self.polls_left.set(left - 1);
        true
    }

    fn stop(&mut self) -> Result<(), NavError> {
        self.stops += 1;
        self.stopped = true;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_sonar_replays_in_order_then_fails() {
        let mut sonar = ScriptedSonar::new("sonar")
            .with_frame(vec![1.0; 8])
            .with_failure("cable unplugged")
            .with_frame(vec![0.5; 8]);

        assert_eq!(sonar.get_sensor_readings().unwrap(), vec![1.0; 8]);
        let err = sonar.get_sensor_readings().unwrap_err();
        assert!(err.to_string().contains("cable unplugged"));
        assert_eq!(sonar.get_sensor_readings().unwrap(), vec![0.5; 8]);
        assert!(matches!(
            sonar.get_sensor_readings(),
            Err(NavError::Collaborator { .. })
        ));
        assert_eq!(sonar.reads(), 4);
    }

    #[test]
    fn repeated_frames_are_queued() {
        let mut sonar = ScriptedSonar::new("sonar").with_repeated_frame(vec![0.9; 8], 3);
        for _ in 0..3 {
            assert!(sonar.get_sensor_readings().is_ok());
        }
        assert!(sonar.get_sensor_readings().is_err());
    }

    #[test]
    fn recording_drive_keeps_history() {
        let mut drive = RecordingDrive::new("base");
        drive.set_wheel_speeds(WheelSpeeds::new(1.0, 1.0)).unwrap();
        drive.set_wheel_speeds(WheelSpeeds::new(0.6, 0.4)).unwrap();
        assert_eq!(
            drive.commands(),
            &[WheelSpeeds::new(1.0, 1.0), WheelSpeeds::new(0.6, 0.4)]
        );
    }

    #[test]
    fn recording_drive_fails_on_requested_command() {
        let mut drive = RecordingDrive::new("base").failing_at(1);
        assert!(drive.set_wheel_speeds(WheelSpeeds::new(1.0, 1.0)).is_ok());
        assert!(drive.set_wheel_speeds(WheelSpeeds::new(1.0, 1.0)).is_err());
        assert!(drive.set_wheel_speeds(WheelSpeeds::new(0.4, 0.6)).is_ok());
        assert_eq!(drive.commands().len(), 2);
    }

    #[test]
    fn scripted_simulation_runs_for_budget() {
        let mut sim = ScriptedSimulation::new(2);
        assert!(!sim.is_running(), "not running before start");
        sim.start().unwrap();
        assert!(sim.is_running());
        assert!(sim.is_running());
        assert!(!sim.is_running());
        sim.stop().unwrap();
        assert_eq!((sim.starts(), sim.stops()), (1, 1));
    }

    #[test]
    fn stopped_simulation_is_not_running() {
        let mut sim = ScriptedSimulation::new(u64::MAX);
        sim.start().unwrap();
        assert!(sim.is_running());
        sim.stop().unwrap();
        assert!(!sim.is_running());
    }

    #[test]
    fn failing_start_reports_collaborator_error() {
        let mut sim = ScriptedSimulation::new(10).failing_start();
        assert!(matches!(sim.start(), Err(NavError::Collaborator { .. })));
        assert!(!sim.is_running());
    }
}
