//! Headless kinematic world with a P3-DX style sonar ring.
//!
//! [`SimWorld`] models a rectangular arena with circular obstacles and a
//! differential-drive robot.  Every wheel command advances the world by one
//! fixed time step; every sonar sweep ray-casts the sixteen P3-DX sensors
//! against the walls and obstacles.
//!
//! [`SimSession`] shares one world between the three collaborator roles
//! ([`Simulation`], [`SonarArray`], [`WheelDrive`]) so the control loop can
//! hold them as separate handles.
//!
//! # Geometry
//!
//! * Arena walls at `x = 0`, `x = arena_width`, `y = 0`, `y = arena_height`.
//! * Heading `0` points along `+x`; angles grow counter-clockwise.
//! * Sonars sit on the body circle and look outwards along their mounting
//!   angle.  A sensor that sees nothing within `sonar_range` reports
//!   `sonar_range`.
//!
//! # Example
//!
//! ```rust
//! use sonarnav_hal::world::{SimSession, WorldParams};
//! use sonarnav_hal::{Simulation, SonarArray, WheelDrive};
//! use sonarnav_types::WheelSpeeds;
//!
//! let mut session = SimSession::new(WorldParams::default()).unwrap();
//! session.start().unwrap();
//! let readings = session.get_sensor_readings().unwrap();
//! assert_eq!(readings.len(), 16);
//! session.set_wheel_speeds(WheelSpeeds::new(1.0, 1.0)).unwrap();
//! assert_eq!(session.stats().unwrap().steps, 1);
//! ```

use std::f32::consts::{PI, TAU};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use sonarnav_types::{NavError, WheelSpeeds};
use tracing::{debug, info, warn};

use crate::drive::WheelDrive;
use crate::simulation::Simulation;
use crate::sonar::SonarArray;

/// Mounting angles of the sixteen P3-DX sonars in degrees, relative to the
/// robot heading.  Front arc from left to right, then rear arc from right to
/// left.
pub const P3DX_SONAR_ANGLES_DEG: [f32; 16] = [
    90.0, 50.0, 30.0, 10.0, -10.0, -30.0, -50.0, -90.0, //
    -90.0, -130.0, -150.0, -170.0, 170.0, 150.0, 130.0, 90.0,
];

// ────────────────────────────────────────────────────────────────────────────
// Parameters
// ────────────────────────────────────────────────────────────────────────────

/// Planar robot pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    /// Radians, counter-clockwise from `+x`.
    pub heading: f32,
}

/// A circular obstacle (pillar, barrel, …).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// World configuration.  Lengths in metres, time in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldParams {
    pub arena_width: f32,
    pub arena_height: f32,
    /// Radius of the robot body; sonars sit on this circle.
    pub body_radius: f32,
    /// Distance between the two drive wheels.
    pub wheel_base: f32,
    /// Wheel surface speed (m/s) for a command of `1.0`.
    pub max_wheel_speed: f32,
    /// Duration of one simulation step.
    pub dt: f32,
    pub sonar_range: f32,
    /// Stop reporting "running" after this many steps.  `None` runs until
    /// stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_budget: Option<u64>,
    pub start: Pose,
    pub obstacles: Vec<Obstacle>,
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            arena_width: 5.0,
            arena_height: 5.0,
            body_radius: 0.2,
            wheel_base: 0.33,
            max_wheel_speed: 0.5,
            dt: 0.05,
            sonar_range: 1.0,
            step_budget: None,
            start: Pose {
                x: 2.5,
                y: 2.5,
                heading: 0.0,
            },
            obstacles: Vec::new(),
        }
    }
}

impl WorldParams {
    /// Check dimensions and that the robot starts in free space.
    pub fn validate(&self) -> Result<(), NavError> {
        let positive = [
            ("arena_width", self.arena_width),
            ("arena_height", self.arena_height),
            ("body_radius", self.body_radius),
            ("wheel_base", self.wheel_base),
            ("max_wheel_speed", self.max_wheel_speed),
            ("dt", self.dt),
            ("sonar_range", self.sonar_range),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(NavError::Configuration(format!(
                    "world parameter {name} must be positive, got {value}"
                )));
            }
        }
        for (i, obstacle) in self.obstacles.iter().enumerate() {
            if !obstacle.radius.is_finite() || obstacle.radius <= 0.0 {
                return Err(NavError::Configuration(format!(
                    "obstacle {i} must have a positive radius, got {}",
                    obstacle.radius
                )));
            }
        }
        if body_collides(self, self.start.x, self.start.y) {
            return Err(NavError::Configuration(format!(
                "start pose ({}, {}) is not in free space",
                self.start.x, self.start.y
            )));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimWorld
// ────────────────────────────────────────────────────────────────────────────

/// Snapshot of the world counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimStats {
    pub pose: Pose,
    pub steps: u64,
    /// Steps in which the commanded motion was blocked by a wall or obstacle.
    pub collisions: u64,
    pub last_command: Option<WheelSpeeds>,
}

/// The simulated arena and robot.
#[derive(Debug, Clone)]
pub struct SimWorld {
    params: WorldParams,
    pose: Pose,
    steps: u64,
    collisions: u64,
    last_command: Option<WheelSpeeds>,
    started: bool,
    stopped: bool,
}

impl SimWorld {
    /// # Errors
    ///
    /// Returns [`NavError::Configuration`] when `params` fail validation.
    pub fn new(params: WorldParams) -> Result<Self, NavError> {
        params.validate()?;
        Ok(Self {
            pose: params.start,
            params,
            steps: 0,
            collisions: 0,
            last_command: None,
            started: false,
            stopped: false,
        })
    }

    pub fn stats(&self) -> SimStats {
        SimStats {
            pose: self.pose,
            steps: self.steps,
            collisions: self.collisions,
            last_command: self.last_command,
        }
    }

    /// Ray-cast every sonar from the current pose.
    pub fn sonar_sweep(&self) -> Vec<f32> {
        P3DX_SONAR_ANGLES_DEG
            .iter()
            .map(|deg| {
                let angle = self.pose.heading + deg.to_radians();
                let (dy, dx) = angle.sin_cos();
                let ox = self.pose.x + self.params.body_radius * dx;
                let oy = self.pose.y + self.params.body_radius * dy;
                self.ray_distance(ox, oy, dx, dy).min(self.params.sonar_range)
            })
            .collect()
    }

    /// Apply `speeds` for one time step.
    ///
    /// Commands are clamped to `±1.0`.  If the resulting position would
    /// overlap a wall or obstacle the robot only rotates and the step is
    /// counted as a collision.
    pub fn step(&mut self, speeds: WheelSpeeds) {
        let p = &self.params;
        let v_left = speeds.left.clamp(-1.0, 1.0) * p.max_wheel_speed;
        let v_right = speeds.right.clamp(-1.0, 1.0) * p.max_wheel_speed;
        let v = 0.5 * (v_left + v_right);
        let omega = (v_right - v_left) / p.wheel_base;

        let mid_heading = self.pose.heading + 0.5 * omega * p.dt;
        let x = self.pose.x + v * mid_heading.cos() * p.dt;
        let y = self.pose.y + v * mid_heading.sin() * p.dt;
        let heading = wrap_angle(self.pose.heading + omega * p.dt);

        if body_collides(p, x, y) {
            self.collisions += 1;
            self.pose.heading = heading;
        } else {
            self.pose = Pose { x, y, heading };
        }
        self.steps += 1;
        self.last_command = Some(speeds);
    }

    fn is_running(&self) -> bool {
        self.started
            && !self.stopped
            && self.params.step_budget.is_none_or(|budget| self.steps < budget)
    }

    fn ray_distance(&self, ox: f32, oy: f32, dx: f32, dy: f32) -> f32 {
        let p = &self.params;
        let mut t = f32::INFINITY;
        if dx > f32::EPSILON {
            t = t.min((p.arena_width - ox) / dx);
        } else if dx < -f32::EPSILON {
            t = t.min(-ox / dx);
        }
        if dy > f32::EPSILON {
            t = t.min((p.arena_height - oy) / dy);
        } else if dy < -f32::EPSILON {
            t = t.min(-oy / dy);
        }
        for obstacle in &p.obstacles {
            if let Some(hit) = circle_hit(ox, oy, dx, dy, obstacle) {
                t = t.min(hit);
            }
        }
        t.max(0.0)
    }
}

/// Distance along the unit ray `(dx, dy)` from `(ox, oy)` to `obstacle`, or
/// `None` when the ray misses.  An origin inside the obstacle reads `0`.
fn circle_hit(ox: f32, oy: f32, dx: f32, dy: f32, obstacle: &Obstacle) -> Option<f32> {
    let fx = ox - obstacle.x;
    let fy = oy - obstacle.y;
    let c = fx * fx + fy * fy - obstacle.radius * obstacle.radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let b = fx * dx + fy * dy;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    (t >= 0.0).then_some(t)
}

fn body_collides(params: &WorldParams, x: f32, y: f32) -> bool {
    let r = params.body_radius;
    if x - r < 0.0 || x + r > params.arena_width || y - r < 0.0 || y + r > params.arena_height {
        return true;
    }
    params.obstacles.iter().any(|o| {
        let (ddx, ddy) = (x - o.x, y - o.y);
        let reach = r + o.radius;
        ddx * ddx + ddy * ddy < reach * reach
    })
}

fn wrap_angle(angle: f32) -> f32 {
    let a = angle % TAU;
    if a > PI {
        a - TAU
    } else if a < -PI {
        a + TAU
    } else {
        a
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimSession
// ────────────────────────────────────────────────────────────────────────────

/// Cloneable handle onto one [`SimWorld`].
///
/// Every clone sees the same world, so one clone can serve as the lifecycle
/// collaborator, one as the sonar and one as the drive.
#[derive(Clone)]
pub struct SimSession {
    world: Arc<Mutex<SimWorld>>,
}

impl SimSession {
    pub fn new(params: WorldParams) -> Result<Self, NavError> {
        Ok(Self::from_world(SimWorld::new(params)?))
    }

    pub fn from_world(world: SimWorld) -> Self {
        Self {
            world: Arc::new(Mutex::new(world)),
        }
    }

    pub fn stats(&self) -> Result<SimStats, NavError> {
        Ok(self.lock()?.stats())
    }

    fn lock(&self) -> Result<MutexGuard<'_, SimWorld>, NavError> {
        self.world
            .lock()
            .map_err(|_| NavError::collaborator("simulation", "world lock poisoned"))
    }
}

impl Simulation for SimSession {
    fn start(&mut self) -> Result<(), NavError> {
        let mut world = self.lock()?;
        if world.stopped {
            return Err(NavError::collaborator(
                "simulation",
                "cannot restart a stopped simulation",
            ));
        }
        world.started = true;
        info!(
            x = world.pose.x,
            y = world.pose.y,
            obstacles = world.params.obstacles.len(),
            "simulation started"
        );
        Ok(())
    }

    fn is_running(&self) -> bool {
        match self.lock() {
            Ok(world) => world.is_running(),
            Err(e) => {
                warn!(error = %e, "simulation state unavailable");
                false
            }
        }
    }

    fn stop(&mut self) -> Result<(), NavError> {
        let mut world = self.lock()?;
        world.stopped = true;
        info!(
            steps = world.steps,
            collisions = world.collisions,
            "simulation stopped"
        );
        Ok(())
    }
}

impl SonarArray for SimSession {
    fn id(&self) -> &str {
        "p3dx_sonar"
    }

    fn get_sensor_readings(&mut self) -> Result<Vec<f32>, NavError> {
        Ok(self.lock()?.sonar_sweep())
    }
}

impl WheelDrive for SimSession {
    fn id(&self) -> &str {
        "p3dx_base"
    }

    fn set_wheel_speeds(&mut self, speeds: WheelSpeeds) -> Result<(), NavError> {
        let mut world = self.lock()?;
        if !world.started || world.stopped {
            return Err(NavError::collaborator(
                "p3dx_base",
                "wheel command outside a running simulation",
            ));
        }
        world.step(speeds);
        debug!(
            x = world.pose.x,
            y = world.pose.y,
            heading = world.pose.heading,
            "robot moved"
        );
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
