//! Configuration – reads/writes `~/.sonarnav/config.toml`.
//!
//! ```toml
//! [controller.thresholds]
//! very_close = 0.8
//! close = 0.5
//! safe = 0.3
//!
//! [controller.speeds]
//! normal = 1.0
//! turn = 0.6
//! slow = 0.4
//!
//! [controller.zones]
//! left = { start = 2, end = 4 }
//! center = { start = 4, end = 6 }
//! right = { start = 6, end = 8 }
//!
//! [sim]
//! arena_width = 5.0
//! step_budget = 2000
//!
//! [[sim.obstacles]]
//! x = 1.2
//! y = 1.2
//! radius = 0.3
//!
//! [run]
//! max_cycles = 500
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use sonarnav_control::ControllerParams;
use sonarnav_hal::world::{Obstacle, WorldParams};
use sonarnav_types::NavError;
use thiserror::Error;
use tracing::warn;

/// Errors raised while loading, validating or saving the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] NavError),
}

/// Settings for the control run itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Stop after this many cycles.  Unset runs until the simulation stops.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cycles: Option<u64>,
}

/// Persisted configuration stored in `~/.sonarnav/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub run: RunSettings,
    pub controller: ControllerParams,
    /// Fields missing from `[sim]` are taken from the demo arena, not from
    /// an empty one.
    #[serde(deserialize_with = "sim_over_defaults")]
    pub sim: WorldParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run: RunSettings::default(),
            controller: ControllerParams::default(),
            sim: default_world(),
        }
    }
}

/// A small cluttered arena so a bare `sonarnav run` has something to avoid.
fn default_world() -> WorldParams {
    WorldParams {
        step_budget: Some(2_000),
        obstacles: vec![
            Obstacle {
                x: 1.2,
                y: 1.2,
                radius: 0.3,
            },
            Obstacle {
                x: 3.8,
                y: 1.5,
                radius: 0.25,
            },
            Obstacle {
                x: 2.0,
                y: 3.9,
                radius: 0.4,
            },
        ],
        ..WorldParams::default()
    }
}

/// Overlay the keys of a `[sim]` table onto [`default_world`].
fn sim_over_defaults<'de, D: Deserializer<'de>>(deserializer: D) -> Result<WorldParams, D::Error> {
    let overlay = toml::Table::deserialize(deserializer)?;
    let mut merged = toml::Value::try_from(default_world()).map_err(D::Error::custom)?;
    if let toml::Value::Table(base) = &mut merged {
        merge_tables(base, overlay);
    }
    merged.try_into().map_err(D::Error::custom)
}

/// Nested tables are merged key by key; anything else (including arrays such
/// as `obstacles`) replaces the base value.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(inner)), toml::Value::Table(patch)) => {
                merge_tables(inner, patch)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

impl Config {
    /// Render as pretty TOML.
    ///
    /// Every float in the config is an `f32`; they are written with their
    /// shortest `f32` spelling so `0.8` stays `0.8` instead of widening to
    /// `0.800000011920929`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let mut value = toml::Value::try_from(self)?;
        shorten_floats(&mut value);
        Ok(toml::to_string_pretty(&value)?)
    }

    /// Validate the controller and world sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.controller.validate()?;
        self.sim.validate()?;
        Ok(())
    }
}

/// Return the path to `~/.sonarnav/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".sonarnav").join("config.toml")
}

/// Load the effective configuration.
///
/// With an explicit `path` the file must exist.  Without one,
/// `~/.sonarnav/config.toml` is used when present and the defaults
/// otherwise.  Environment overrides are applied and the result validated in
/// both cases.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut cfg = match path {
        Some(p) => read_from(p)?,
        None => {
            let default_path = config_path();
            if default_path.exists() {
                read_from(&default_path)?
            } else {
                Config::default()
            }
        }
    };
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Parse the config file at `path` without overrides or validation.
pub(crate) fn read_from(path: &Path) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&raw)?)
}

/// Apply `SONARNAV_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SONARNAV_MAX_CYCLES` | `run.max_cycles` |
/// | `SONARNAV_STEP_BUDGET` | `sim.step_budget` |
/// | `SONARNAV_SONAR_RANGE` | `sim.sonar_range` |
/// | `SONARNAV_DT` | `sim.dt` |
///
/// Unparseable values are logged and ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Some(v) = env_parse::<u64>("SONARNAV_MAX_CYCLES") {
        cfg.run.max_cycles = Some(v);
    }
    if let Some(v) = env_parse::<u64>("SONARNAV_STEP_BUDGET") {
        cfg.sim.step_budget = Some(v);
    }
    if let Some(v) = env_parse::<f32>("SONARNAV_SONAR_RANGE") {
        cfg.sim.sonar_range = v;
    }
    if let Some(v) = env_parse::<f32>("SONARNAV_DT") {
        cfg.sim.dt = v;
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

fn shorten_floats(value: &mut toml::Value) {
    match value {
        toml::Value::Float(f) => {
            if let Ok(short) = (*f as f32).to_string().parse::<f64>() {
                *f = short;
            }
        }
        toml::Value::Array(items) => items.iter_mut().for_each(shorten_floats),
        toml::Value::Table(table) => table.iter_mut().for_each(|(_, v)| shorten_floats(v)),
        _ => {}
    }
}

/// Save `cfg` to `path`, creating the parent directory if necessary.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let raw = cfg.to_toml()?;
    fs::write(path, raw).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
