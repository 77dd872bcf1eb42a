//! [`ControlLoop`] – the read → decide → actuate cycle driver.
//!
//! Each cycle:
//!
//! 1. **Read** – one sweep from the [`SonarArray`].
//! 2. **Decide** – [`ReactiveController::compute_movement`].
//! 3. **Act** – hand the wheel speeds to the [`WheelDrive`].
//!
//! The loop keeps going while the [`Simulation`] reports it is running, no
//! shutdown has been requested and the optional cycle limit has not been hit.
//!
//! # Shutdown guarantee
//!
//! The simulation is wrapped in a [`SimulationGuard`] before `start` is
//! called.  Whatever ends the run (normal exit, a failing `start`, a sensor
//! or actuator error, malformed readings, a panic in a collaborator) the
//! guard calls [`Simulation::stop`] exactly once.  A cycle that fails is
//! abandoned before actuation, so no command is ever issued on bad data.
//!
//! # Example
//!
//! ```rust
//! use sonarnav_control::ReactiveController;
//! use sonarnav_hal::sim::{RecordingDrive, ScriptedSimulation, ScriptedSonar};
//! use sonarnav_runtime::driver::{ControlLoop, ControlLoopConfig};
//!
//! let mut sim = ScriptedSimulation::new(2);
//! let mut sonar = ScriptedSonar::new("sonar").with_repeated_frame(vec![1.0; 8], 2);
//! let mut drive = RecordingDrive::new("base");
//!
//! let summary = ControlLoop::new(ReactiveController::default(), ControlLoopConfig::default())
//!     .run(&mut sim, &mut sonar, &mut drive)
//!     .unwrap();
//! assert_eq!(summary.cycles, 2);
//! assert_eq!(sim.stops(), 1);
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use chrono::Utc;
use sonarnav_control::ReactiveController;
use sonarnav_hal::{Simulation, SonarArray, WheelDrive};
use sonarnav_types::{Action, ActionCounts, NavError, RunSummary, Termination};
use tracing::{debug_span, error, info, info_span, warn};
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`ControlLoop`].
#[derive(Debug, Clone, Default)]
pub struct ControlLoopConfig {
    /// Stop after this many completed cycles.  `None` runs until the
    /// simulation stops or shutdown is requested.
    pub max_cycles: Option<u64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// SimulationGuard
// ─────────────────────────────────────────────────────────────────────────────

/// Scoped ownership of a running simulation.
///
/// Dropping the guard stops the simulation unless [`finish`][Self::finish]
/// already did.  `stop` is therefore called exactly once per guard.
pub struct SimulationGuard<'a, S: Simulation + ?Sized> {
    sim: &'a mut S,
    stopped: bool,
}

impl<'a, S: Simulation + ?Sized> SimulationGuard<'a, S> {
    /// Take charge of `sim`.  Does not start it.
    pub fn new(sim: &'a mut S) -> Self {
        Self {
            sim,
            stopped: false,
        }
    }

    pub fn start(&mut self) -> Result<(), NavError> {
        self.sim.start()
    }

    pub fn is_running(&self) -> bool {
        self.sim.is_running()
    }

    /// Stop the simulation now and report any error from the stop request.
    pub fn finish(mut self) -> Result<(), NavError> {
        self.stopped = true;
        self.sim.stop()
    }
}

impl<S: Simulation + ?Sized> Drop for SimulationGuard<'_, S> {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Err(e) = self.sim.stop() {
            error!(error = %e, "failed to stop simulation");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ControlLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Drives a [`ReactiveController`] against sensing, actuation and lifecycle
/// collaborators.
///
/// The loop owns no collaborator; they are lent to [`run`][Self::run] for
/// the duration of one run.
pub struct ControlLoop {
    controller: ReactiveController,
    config: ControlLoopConfig,
    shutdown: Arc<AtomicBool>,
}

impl ControlLoop {
    pub fn new(controller: ReactiveController, config: ControlLoopConfig) -> Self {
        Self {
            controller,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use an externally owned shutdown flag (e.g. one set by a Ctrl-C
    /// handler).
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    /// Flag that ends the run before the next cycle once set to `true`.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run cycles until the simulation stops, the cycle limit is reached or
    /// shutdown is requested.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `start`, a sensor read, the decision
    /// (e.g. [`NavError::InvalidInput`]) or an actuation.  There are no
    /// retries.  The simulation has been stopped by the time this returns.
    pub fn run<S, R, D>(
        &self,
        sim: &mut S,
        sonar: &mut R,
        drive: &mut D,
    ) -> Result<RunSummary, NavError>
    where
        S: Simulation + ?Sized,
        R: SonarArray + ?Sized,
        D: WheelDrive + ?Sized,
    {
        let run_id = Uuid::new_v4();
        let span = info_span!("control_run", %run_id, sonar = sonar.id(), drive = drive.id());
        let _enter = span.enter();

        let started_at = Utc::now();
        let mut guard = SimulationGuard::new(sim);
        if let Err(e) = guard.start() {
            error!(error = %e, "simulation failed to start");
            return Err(e);
        }
        info!(
            max_cycles = ?self.config.max_cycles,
            required_readings = self.controller.required_readings(),
            "control loop started"
        );

        let mut counts = ActionCounts::default();
        let mut cycles: u64 = 0;
        let termination = loop {
            if self.shutdown.load(Ordering::SeqCst) {
                warn!(cycles, "shutdown requested");
                break Termination::ShutdownRequested;
            }
            if self.config.max_cycles.is_some_and(|max| cycles >= max) {
                break Termination::CycleLimit;
            }
            if !guard.is_running() {
                break Termination::SimulationStopped;
            }
            match self.cycle(cycles, sonar, drive) {
                Ok(action) => {
                    counts.record(action);
                    cycles += 1;
                }
                Err(e) => {
                    error!(cycle = cycles, error = %e, "control cycle failed; stopping simulation");
                    return Err(e);
                }
            }
        };

        guard.finish()?;
        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            cycles,
            action_counts: counts,
            termination,
        };
        info!(
            cycles,
            ?termination,
            advance = counts.advance,
            turn_left = counts.turn_left,
            turn_right = counts.turn_right,
            emergency_turn = counts.emergency_turn,
            "control loop finished"
        );
        Ok(summary)
    }

    fn cycle<R, D>(&self, index: u64, sonar: &mut R, drive: &mut D) -> Result<Action, NavError>
    where
        R: SonarArray + ?Sized,
        D: WheelDrive + ?Sized,
    {
        let span = debug_span!("cycle", index);
        let _enter = span.enter();

        let readings = sonar.get_sensor_readings()?;
        let decision = self.controller.compute_movement(&readings)?;
        drive.set_wheel_speeds(decision.speeds)?;
        Ok(decision.action)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sonarnav_hal::sim::{RecordingDrive, ScriptedSimulation, ScriptedSonar};
    use sonarnav_types::WheelSpeeds;

    const CLEAR: [f32; 8] = [1.0; 8];
    const WALL_AHEAD: [f32; 8] = [1.0, 1.0, 1.0, 1.0, 0.2, 0.2, 1.0, 1.0];

    fn control_loop() -> ControlLoop {
        ControlLoop::new(ReactiveController::default(), ControlLoopConfig::default())
    }

    #[test]
    fn runs_until_simulation_stops() {
        let mut sim = ScriptedSimulation::new(3);
        let mut sonar = ScriptedSonar::new("sonar")
            .with_frame(CLEAR.to_vec())
            .with_frame(WALL_AHEAD.to_vec())
            .with_frame(CLEAR.to_vec());
        let mut drive = RecordingDrive::new("base");

        let summary = control_loop().run(&mut sim, &mut sonar, &mut drive).unwrap();

        assert_eq!(summary.cycles, 3);
        assert_eq!(summary.termination, Termination::SimulationStopped);
        assert_eq!(summary.action_counts.advance, 2);
        assert_eq!(summary.action_counts.emergency_turn, 1);
        assert_eq!(
            drive.commands(),
            &[
                WheelSpeeds::new(1.0, 1.0),
                WheelSpeeds::new(-0.4, 0.6),
                WheelSpeeds::new(1.0, 1.0)
            ]
        );
        assert_eq!((sim.starts(), sim.stops()), (1, 1));
    }

    #[test]
    fn cycle_limit_ends_run() {
        let mut sim = ScriptedSimulation::new(u64::MAX);
        let mut sonar = ScriptedSonar::new("sonar").with_repeated_frame(CLEAR.to_vec(), 10);
        let mut drive = RecordingDrive::new("base");

        let summary = ControlLoop::new(
            ReactiveController::default(),
            ControlLoopConfig {
                max_cycles: Some(4),
            },
        )
        .run(&mut sim, &mut sonar, &mut drive)
        .unwrap();

        assert_eq!(summary.cycles, 4);
        assert_eq!(summary.termination, Termination::CycleLimit);
        assert_eq!(sonar.reads(), 4);
        assert_eq!(sim.stops(), 1);
    }

    #[test]
    fn shutdown_flag_ends_run_before_first_cycle() {
        let mut sim = ScriptedSimulation::new(u64::MAX);
        let mut sonar = ScriptedSonar::new("sonar").with_frame(CLEAR.to_vec());
        let mut drive = RecordingDrive::new("base");

        let driver = control_loop();
        driver.shutdown_handle().store(true, Ordering::SeqCst);
        let summary = driver.run(&mut sim, &mut sonar, &mut drive).unwrap();

        assert_eq!(summary.cycles, 0);
        assert_eq!(summary.termination, Termination::ShutdownRequested);
        assert!(drive.commands().is_empty());
        assert_eq!(sim.stops(), 1);
    }

    #[test]
    fn external_shutdown_flag_is_shared() {
        let flag = Arc::new(AtomicBool::new(false));
        let driver = control_loop().with_shutdown_flag(Arc::clone(&flag));
        flag.store(true, Ordering::SeqCst);
        assert!(driver.shutdown_handle().load(Ordering::SeqCst));
    }

    #[test]
    fn short_readings_stop_without_actuation() {
        let mut sim = ScriptedSimulation::new(u64::MAX);
        let mut sonar = ScriptedSonar::new("sonar")
            .with_frame(CLEAR.to_vec())
            .with_frame(vec![1.0; 5]);
        let mut drive = RecordingDrive::new("base");

        let err = control_loop()
            .run(&mut sim, &mut sonar, &mut drive)
            .unwrap_err();

        assert_eq!(
            err,
            NavError::InvalidInput {
                required: 8,
                actual: 5
            }
        );
        assert_eq!(drive.commands().len(), 1, "only the valid cycle actuated");
        assert_eq!(sim.stops(), 1);
    }

    #[test]
    fn sensor_failure_stops_simulation() {
        let mut sim = ScriptedSimulation::new(u64::MAX);
        let mut sonar = ScriptedSonar::new("sonar").with_failure("connection lost");
        let mut drive = RecordingDrive::new("base");

        let err = control_loop()
            .run(&mut sim, &mut sonar, &mut drive)
            .unwrap_err();

        assert!(matches!(err, NavError::Collaborator { .. }));
        assert!(drive.commands().is_empty());
        assert_eq!(sim.stops(), 1);
    }

    #[test]
    fn actuation_failure_stops_simulation_without_retry() {
        let mut sim = ScriptedSimulation::new(u64::MAX);
        let mut sonar = ScriptedSonar::new("sonar").with_repeated_frame(CLEAR.to_vec(), 5);
        let mut drive = RecordingDrive::new("base").failing_at(1);

        let err = control_loop()
            .run(&mut sim, &mut sonar, &mut drive)
            .unwrap_err();

        assert!(matches!(err, NavError::Collaborator { .. }));
        assert_eq!(sonar.reads(), 2, "no read after the failed actuation");
        assert_eq!(drive.commands().len(), 1);
        assert_eq!(sim.stops(), 1);
    }

    #[test]
    fn failed_start_still_stops_once() {
        let mut sim = ScriptedSimulation::new(10).failing_start();
        let mut sonar = ScriptedSonar::new("sonar").with_frame(CLEAR.to_vec());
        let mut drive = RecordingDrive::new("base");

        let err = control_loop()
            .run(&mut sim, &mut sonar, &mut drive)
            .unwrap_err();

        assert!(matches!(err, NavError::Collaborator { .. }));
        assert_eq!(sonar.reads(), 0);
        assert_eq!((sim.starts(), sim.stops()), (1, 1));
    }

    #[test]
    fn panicking_sensor_still_stops_simulation() {
        struct PanickingSonar;
        impl SonarArray for PanickingSonar {
            fn id(&self) -> &str {
                "panicking"
            }
            fn get_sensor_readings(&mut self) -> Result<Vec<f32>, NavError> {
                panic!("driver bug");
            }
        }

        let mut sim = ScriptedSimulation::new(u64::MAX);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut drive = RecordingDrive::new("base");
            control_loop().run(&mut sim, &mut PanickingSonar, &mut drive)
        }));
        assert!(result.is_err());
        assert_eq!(sim.stops(), 1);
    }

    #[test]
    fn guard_finish_does_not_stop_twice() {
        let mut sim = ScriptedSimulation::new(1);
        {
            let mut guard = SimulationGuard::new(&mut sim);
            guard.start().unwrap();
            guard.finish().unwrap();
        }
        assert_eq!(sim.stops(), 1);
    }

    #[test]
    fn dropped_guard_stops_simulation() {
        let mut sim = ScriptedSimulation::new(1);
        {
            let mut guard = SimulationGuard::new(&mut sim);
            guard.start().unwrap();
        }
        assert_eq!(sim.stops(), 1);
    }

    #[test]
    fn collaborators_work_as_trait_objects() {
        let mut sim: Box<dyn Simulation> = Box::new(ScriptedSimulation::new(1));
        let mut sonar: Box<dyn SonarArray> =
            Box::new(ScriptedSonar::new("sonar").with_frame(CLEAR.to_vec()));
        let mut drive: Box<dyn WheelDrive> = Box::new(RecordingDrive::new("base"));

        let summary = control_loop()
            .run(sim.as_mut(), sonar.as_mut(), drive.as_mut())
            .unwrap();
        assert_eq!(summary.cycles, 1);
    }
}
