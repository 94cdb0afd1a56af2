//! Joystick sources: shaping of raw axes and the two drive input schemes.

use std::sync::Arc;

use crate::config::{DriveConfig, JoystickConfig};
use crate::data::TankDriveData;
use crate::error::{BuildError, TickError};
use crate::pipeline::{Source, Stage};

pub type AxisId = u8;

/// Human input device exposing axes in `[-1, 1]`.
pub trait AxisInput {
    fn read_axis(&self, axis: AxisId) -> f64;
}

impl<T: AxisInput + ?Sized> AxisInput for Arc<T> {
    fn read_axis(&self, axis: AxisId) -> f64 {
        (**self).read_axis(axis)
    }
}

impl<T: AxisInput + ?Sized> AxisInput for &T {
    fn read_axis(&self, axis: AxisId) -> f64 {
        (**self).read_axis(axis)
    }
}

/// Deadzone, optional rescale, then gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoystickShaping {
    deadzone: f64,
    power: f64,
    rescale: bool,
}

impl JoystickShaping {
    pub fn new(deadzone: f64, power: f64, rescale: bool) -> Result<Self, BuildError> {
        if !(0.0..1.0).contains(&deadzone) {
            return Err(BuildError::InvalidConfig {
                key: "deadzone",
                value: deadzone,
                reason: "must be within [0, 1)",
            });
        }
        if !power.is_finite() {
            return Err(BuildError::InvalidConfig {
                key: "power",
                value: power,
                reason: "must be finite",
            });
        }
        Ok(Self {
            deadzone,
            power,
            rescale,
        })
    }

    pub fn from_config(config: &JoystickConfig) -> Result<Self, BuildError> {
        Self::new(config.deadzone, config.power, config.rescale)
    }

    /// Raw axis passthrough.
    pub fn identity() -> Self {
        Self {
            deadzone: 0.0,
            power: 1.0,
            rescale: false,
        }
    }

    pub fn shape(&self, raw: f64) -> f64 {
        // Disconnected devices may report NaN
        if !raw.is_finite() {
            return 0.0;
        }
        let x = raw.clamp(-1.0, 1.0);
        if x.abs() < self.deadzone {
            return 0.0;
        }
        let x = if self.rescale {
            x.signum() * (x.abs() - self.deadzone) / (1.0 - self.deadzone)
        } else {
            x
        };
        x * self.power
    }
}

impl Stage<f64> for JoystickShaping {
    type Output = f64;

    fn apply(&mut self, input: f64) -> Result<f64, TickError> {
        Ok(self.shape(input))
    }
}

// ============================================================================
// TANK INPUT - one stick per side plus a straight-drive trigger pair
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankAxes {
    pub left: AxisId,
    pub right: AxisId,
    pub forward_trigger: Option<AxisId>,
    pub back_trigger: Option<AxisId>,
    pub invert_left: bool,
    pub invert_right: bool,
}

impl Default for TankAxes {
    fn default() -> Self {
        Self {
            left: 1,
            right: 5,
            forward_trigger: Some(3),
            back_trigger: Some(2),
            invert_left: false,
            invert_right: false,
        }
    }
}

/// Emits percent-output values per side and no setpoints.
pub struct TankJoystickSource<I> {
    input: I,
    axes: TankAxes,
    shaping: JoystickShaping,
}

impl<I: AxisInput> TankJoystickSource<I> {
    pub fn new(input: I, axes: TankAxes, shaping: JoystickShaping) -> Self {
        Self {
            input,
            axes,
            shaping,
        }
    }

    fn axis(&self, axis: Option<AxisId>) -> f64 {
        axis.map_or(0.0, |id| self.shaping.shape(self.input.read_axis(id)))
    }
}

impl<I: AxisInput> Source for TankJoystickSource<I> {
    type Output = TankDriveData;

    fn produce(&mut self) -> Result<TankDriveData, TickError> {
        let flip = |invert: bool| if invert { -1.0 } else { 1.0 };
        let trigger = self.axis(self.axes.forward_trigger) - self.axis(self.axes.back_trigger);
        let left = flip(self.axes.invert_left) * self.axis(Some(self.axes.left)) + trigger;
        let right = flip(self.axes.invert_right) * self.axis(Some(self.axes.right)) + trigger;

        Ok(TankDriveData::from_values(
            left.clamp(-1.0, 1.0),
            right.clamp(-1.0, 1.0),
        ))
    }
}

// ============================================================================
// ARCADE INPUT - throttle with soft and hard turning, in velocity units
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcadeAxes {
    pub throttle: AxisId,
    pub invert_throttle: bool,
    /// Turning scaled by throttle magnitude, like steering a car.
    pub soft_turn: AxisId,
    /// Turn-in-place pair, positive minus negative.
    pub hard_turn_positive: Option<AxisId>,
    pub hard_turn_negative: Option<AxisId>,
}

impl Default for ArcadeAxes {
    fn default() -> Self {
        Self {
            throttle: 1,
            invert_throttle: true,
            soft_turn: 4,
            hard_turn_positive: Some(3),
            hard_turn_negative: Some(2),
        }
    }
}

/// Emits per-side velocities and the turn rate they imply.
pub struct ArcadeJoystickSource<I> {
    input: I,
    axes: ArcadeAxes,
    shaping: JoystickShaping,
    max_velocity: f64,
    track_width: f64,
    reverse_backwards: bool,
}

impl<I: AxisInput> ArcadeJoystickSource<I> {
    pub fn new(
        input: I,
        axes: ArcadeAxes,
        shaping: JoystickShaping,
        drive: &DriveConfig,
    ) -> Result<Self, BuildError> {
        if !(drive.max_velocity.is_finite() && drive.max_velocity > 0.0) {
            return Err(BuildError::InvalidConfig {
                key: "max_velocity",
                value: drive.max_velocity,
                reason: "must be positive",
            });
        }
        if !(drive.track_width.is_finite() && drive.track_width > 0.0) {
            return Err(BuildError::InvalidConfig {
                key: "track_width",
                value: drive.track_width,
                reason: "must be positive",
            });
        }
        Ok(Self {
            input,
            axes,
            shaping,
            max_velocity: drive.max_velocity,
            track_width: drive.track_width,
            reverse_backwards: drive.reverse_backwards,
        })
    }

    fn axis(&self, axis: Option<AxisId>) -> f64 {
        axis.map_or(0.0, |id| self.shaping.shape(self.input.read_axis(id)))
    }
}

impl<I: AxisInput> Source for ArcadeJoystickSource<I> {
    type Output = TankDriveData;

    fn produce(&mut self) -> Result<TankDriveData, TickError> {
        let mut throttle = self.axis(Some(self.axes.throttle));
        if self.axes.invert_throttle {
            throttle = -throttle;
        }
        let mut soft = self.axis(Some(self.axes.soft_turn));
        if self.reverse_backwards && throttle < 0.0 {
            soft = -soft;
        }
        let hard = self.axis(self.axes.hard_turn_positive) - self.axis(self.axes.hard_turn_negative);

        let left = throttle + soft * throttle.abs() + hard;
        let right = throttle - soft * throttle.abs() - hard;
        let scale = left.abs().max(right.abs()).max(1.0);

        let left = left / scale * self.max_velocity;
        let right = right / scale * self.max_velocity;

        Ok(TankDriveData::from_values(left, right)
            .with_turn_rate((right - left) / self.track_width))
    }
}
