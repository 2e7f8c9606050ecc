//! Controller configuration: TOML loading and validation.
//!
//! The configuration names the joints to drive, the command and state
//! interface kinds to claim for each of them, and the loop period. It is
//! loaded and validated before the lifecycle leaves `Unconfigured`; nothing
//! here runs on the real-time path.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{DEFAULT_CYCLE_TIME_US, MAX_CYCLE_TIME_US, MAX_JOINTS, MIN_CYCLE_TIME_US};
use crate::interface::InterfaceKind;

// ─── Error Type ─────────────────────────────────────────────────────

/// Configuration loading/validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read {path}: {message}")]
    Io {
        /// Path that failed to load.
        path: String,
        /// Underlying error text.
        message: String,
    },
    /// TOML parse error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// The joint list is empty.
    #[error("no joints configured")]
    NoJoints,
    /// More joints than the workspace supports.
    #[error("{count} joints configured, limit is {max}")]
    TooManyJoints {
        /// Configured joint count.
        count: usize,
        /// Compile-time limit.
        max: usize,
    },
    /// The same joint name appears twice.
    #[error("duplicate joint name '{0}'")]
    DuplicateJoint(String),
    /// No command interfaces requested — the loop would have nothing to write.
    #[error("no command interfaces configured")]
    NoCommandInterfaces,
    /// An interface list names an unknown kind.
    #[error("unknown interface kind '{0}'")]
    UnknownInterfaceKind(String),
    /// An interface list names the same kind twice.
    #[error("duplicate interface kind '{0}'")]
    DuplicateInterfaceKind(String),
    /// Loop period outside the supported range.
    #[error("cycle_time_us {value} outside {min}..={max}")]
    CycleTimeOutOfRange {
        /// Configured value.
        value: u32,
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },
}

// ─── Controller Config ──────────────────────────────────────────────

/// Controller configuration, as declared in `controller.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Joints to drive, in command order.
    pub joints: Vec<String>,
    /// Command interface kinds to claim per joint (e.g. `["position", "velocity"]`).
    pub command_interfaces: Vec<String>,
    /// State interface kinds to read per joint. May be empty.
    #[serde(default)]
    pub state_interfaces: Vec<String>,
    /// Control loop period [µs].
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,
}

fn default_cycle_time_us() -> u32 {
    DEFAULT_CYCLE_TIME_US
}

impl ControllerConfig {
    /// Run all validation rules. Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.joints.is_empty() {
            return Err(ConfigError::NoJoints);
        }
        if self.joints.len() > MAX_JOINTS {
            return Err(ConfigError::TooManyJoints {
                count: self.joints.len(),
                max: MAX_JOINTS,
            });
        }
        for (i, name) in self.joints.iter().enumerate() {
            if self.joints[..i].contains(name) {
                return Err(ConfigError::DuplicateJoint(name.clone()));
            }
        }

        if self.command_interfaces.is_empty() {
            return Err(ConfigError::NoCommandInterfaces);
        }
        parse_kinds(&self.command_interfaces)?;
        parse_kinds(&self.state_interfaces)?;

        if !(MIN_CYCLE_TIME_US..=MAX_CYCLE_TIME_US).contains(&self.cycle_time_us) {
            return Err(ConfigError::CycleTimeOutOfRange {
                value: self.cycle_time_us,
                min: MIN_CYCLE_TIME_US,
                max: MAX_CYCLE_TIME_US,
            });
        }
        Ok(())
    }

    /// Parsed command interface kinds, in declaration order.
    pub fn command_kinds(&self) -> Result<Vec<InterfaceKind>, ConfigError> {
        parse_kinds(&self.command_interfaces)
    }

    /// Parsed state interface kinds, in declaration order.
    pub fn state_kinds(&self) -> Result<Vec<InterfaceKind>, ConfigError> {
        parse_kinds(&self.state_interfaces)
    }

    /// Loop period as a `Duration`.
    pub fn cycle_time(&self) -> Duration {
        Duration::from_micros(self.cycle_time_us as u64)
    }
}

fn parse_kinds(names: &[String]) -> Result<Vec<InterfaceKind>, ConfigError> {
    let mut kinds = Vec::with_capacity(names.len());
    for name in names {
        let kind: InterfaceKind = name
            .parse()
            .map_err(|_| ConfigError::UnknownInterfaceKind(name.clone()))?;
        if kinds.contains(&kind) {
            return Err(ConfigError::DuplicateInterfaceKind(name.clone()));
        }
        kinds.push(kind);
    }
    Ok(kinds)
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate a controller configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ControllerConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    load_config_from_str(&text)
}

/// Load and validate a controller configuration from a TOML string.
pub fn load_config_from_str(text: &str) -> Result<ControllerConfig, ConfigError> {
    let config: ControllerConfig =
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

// ─── Tests ──────────────────────────────────────────────────────────
