//! `sonarnav-control` – reactive obstacle-avoidance decisions
//!
//! Turns one sonar sweep into one wheel-speed command.  Nothing here talks to
//! hardware or keeps state between sweeps.
//!
//! # Modules
//!
//! - [`zones`] – [`ZoneLayout`][zones::ZoneLayout]: groups sonar indices into
//!   left / center / right zones and reduces each zone to its closest reading.
//! - [`rules`] – [`Thresholds`][rules::Thresholds] and
//!   [`SpeedProfile`][rules::SpeedProfile]: the priority-ordered threshold
//!   rules and the action → wheel-speed table.
//! - [`controller`] – [`ReactiveController`][controller::ReactiveController]:
//!   chains the two into a single `compute_movement` call.

pub mod controller;
pub mod rules;
pub mod zones;

pub use controller::{ControllerParams, Decision, ReactiveController};
pub use rules::{SpeedProfile, Thresholds};
pub use zones::ZoneLayout;
