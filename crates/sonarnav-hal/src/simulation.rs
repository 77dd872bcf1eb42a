//! `Simulation` lifecycle trait.
//!
//! The control loop calls [`Simulation::start`] once, polls
//! [`Simulation::is_running`] before every cycle and calls
//! [`Simulation::stop`] exactly once when it exits, whatever the reason.

use sonarnav_types::NavError;

/// Start/stop control over the world the robot lives in.
pub trait Simulation: Send {
    /// Begin stepping the world.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Collaborator`] if the simulator refuses to start.
    fn start(&mut self) -> Result<(), NavError>;

    /// `true` while the world is stepping and the loop should keep going.
    fn is_running(&self) -> bool;

    /// Stop stepping the world.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Collaborator`] if the stop request fails.
    fn stop(&mut self) -> Result<(), NavError>;
}
