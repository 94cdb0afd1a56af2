//! Error types shared across the pipeline, its collaborators and the executor.

use crate::actuator::{ControlMode, DeviceHandle};
use crate::data::Side;

/// Invalid pipeline assembly or configuration. Fatal to `start`/`reset`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("invalid configuration: `{key}` = {value} ({reason})")]
    InvalidConfig {
        key: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("tick period must be greater than zero")]
    ZeroPeriod,

    #[error("both sides are mapped to device {0}")]
    DuplicateDevice(DeviceHandle),

    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

/// Failure while loading or reading configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("key `{key}` holds `{found}`, expected a {expected}")]
    WrongType {
        key: String,
        found: String,
        expected: &'static str,
    },
}

/// Failure reported by a sensor collaborator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensorError {
    #[error("sensor {0} is not responding")]
    NotResponding(&'static str),

    #[error("sensor {name} returned a non-finite reading ({value})")]
    NonFinite { name: &'static str, value: f64 },
}

/// Failure reported by the actuator driver for a single write.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActuatorError {
    #[error("device {0} not found on the bus")]
    UnknownDevice(DeviceHandle),

    #[error("device {device} rejected {mode} command {value}")]
    Rejected {
        device: DeviceHandle,
        mode: ControlMode,
        value: f64,
    },

    #[error("device {0} timed out")]
    Timeout(DeviceHandle),
}

/// Failure raised during a single tick of an assembled pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TickError {
    #[error("sensor read failed: {0}")]
    Sensor(#[from] SensorError),

    #[error("{side} actuator write failed: {source}")]
    Actuator {
        side: Side,
        #[source]
        source: ActuatorError,
    },

    #[error("left and right actuator writes failed: {left}; {right}")]
    BothActuators {
        left: ActuatorError,
        right: ActuatorError,
    },

    #[error("{0} command reached the sink unresolved")]
    UnresolvedCommand(Side),

    #[error("{side} command is not finite ({value})")]
    NonFiniteCommand { side: Side, value: f64 },

    #[error("stage `{stage}` failed: {reason}")]
    Stage { stage: &'static str, reason: String },

    #[error("tick panicked: {0}")]
    Panic(String),

    #[error("configuration became invalid: {0}")]
    Config(#[from] BuildError),
}

impl TickError {
    /// Fatal errors stop the periodic schedule instead of being contained.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TickError::Config(_))
    }
}

/// Failure returned by executor control operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutorError {
    #[error("executor `{0}` is already running")]
    AlreadyRunning(String),

    #[error("failed to build pipeline: {0}")]
    Build(#[from] BuildError),

    #[error("failed to spawn executor thread: {0}")]
    Spawn(String),

    #[error("executor `{0}` cannot be stopped from its own pipeline thread")]
    FromPipelineThread(String),
}
