//! `sonarnav-runtime` – runs the reactive controller against its
//! collaborators.
//!
//! # Modules
//!
//! - [`driver`] – [`ControlLoop`][driver::ControlLoop]: the read → decide →
//!   actuate cycle, with [`SimulationGuard`][driver::SimulationGuard]
//!   guaranteeing the simulation is stopped exactly once on every exit path.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter.
//!
//! The decision core is re-exported so callers can build a controller
//! without a direct dependency on `sonarnav-control`.

pub mod driver;
pub mod telemetry;

pub use driver::{ControlLoop, ControlLoopConfig, SimulationGuard};
pub use telemetry::{TelemetryConfig, TracerProviderGuard, init_tracing};

pub use sonarnav_control::{ControllerParams, ReactiveController};
