//! Actuator module - driver boundary and the terminal drive sink

pub mod sink;

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{ActuatorError, BuildError};

pub use sink::ActuatorSink;

// ============================================================================
// DEVICE ADDRESSING
// ============================================================================

/// Stable address of a motor controller on the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct DeviceHandle(pub u8);

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Unitless duty cycle in `[-1, 1]`.
    PercentOutput,
    /// Closed-loop velocity in native units, run on the motor controller.
    Velocity,
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMode::PercentOutput => write!(f, "percent-output"),
            ControlMode::Velocity => write!(f, "velocity"),
        }
    }
}

// ============================================================================
// DRIVER BOUNDARY
// ============================================================================

/// Hardware driver turning a command into electrical output.
///
/// Calls are register writes and must not block.
pub trait ActuatorDriver {
    fn set(&self, device: DeviceHandle, mode: ControlMode, value: f64) -> Result<(), ActuatorError>;

    /// Closed-loop ramp time in seconds, applied when a pipeline is built.
    fn configure_ramp(&self, _device: DeviceHandle, _seconds: f64) -> Result<(), ActuatorError> {
        Ok(())
    }
}

impl<D: ActuatorDriver + ?Sized> ActuatorDriver for Arc<D> {
    fn set(&self, device: DeviceHandle, mode: ControlMode, value: f64) -> Result<(), ActuatorError> {
        (**self).set(device, mode, value)
    }

    fn configure_ramp(&self, device: DeviceHandle, seconds: f64) -> Result<(), ActuatorError> {
        (**self).configure_ramp(device, seconds)
    }
}

impl<D: ActuatorDriver + ?Sized> ActuatorDriver for &D {
    fn set(&self, device: DeviceHandle, mode: ControlMode, value: f64) -> Result<(), ActuatorError> {
        (**self).set(device, mode, value)
    }

    fn configure_ramp(&self, device: DeviceHandle, seconds: f64) -> Result<(), ActuatorError> {
        (**self).configure_ramp(device, seconds)
    }
}

// ============================================================================
// ACTUATOR CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    pub left_device: DeviceHandle,
    pub right_device: DeviceHandle,
    pub mode: ControlMode,
    pub ramp: f64,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            left_device: DeviceHandle(1),
            right_device: DeviceHandle(4),
            mode: ControlMode::PercentOutput,
            ramp: 0.0,
        }
    }
}

impl ActuatorConfig {
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.left_device == self.right_device {
            return Err(BuildError::DuplicateDevice(self.left_device));
        }
        if !(self.ramp.is_finite() && self.ramp >= 0.0) {
            return Err(BuildError::InvalidConfig {
                key: "ramp",
                value: self.ramp,
                reason: "must be non-negative seconds",
            });
        }
        Ok(())
    }
}
