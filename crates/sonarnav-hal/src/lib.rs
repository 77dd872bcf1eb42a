//! `sonarnav-hal` – collaborator interfaces for sensing, actuation and the
//! simulation lifecycle.
//!
//! # Modules
//!
//! - [`sonar`] – [`SonarArray`]: one sweep of range readings per cycle.
//! - [`drive`] – [`WheelDrive`]: left/right wheel speed commands.
//! - [`simulation`] – [`Simulation`]: `start` / `is_running` / `stop`.
//! - [`world`] – [`SimSession`][world::SimSession]: a headless kinematic
//!   arena with a sixteen-sonar P3-DX ring implementing all three traits.
//! - [`sim`] – scripted stubs for tests that need exact control over every
//!   reading and failure.

pub mod drive;
pub mod sim;
pub mod simulation;
pub mod sonar;
pub mod world;

pub use drive::WheelDrive;
pub use simulation::Simulation;
pub use sonar::SonarArray;
pub use world::{Obstacle, Pose, SimSession, SimWorld, WorldParams};
