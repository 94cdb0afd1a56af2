//! Sensor and human-input collaborator boundaries.
//!
//! Reads are expected to be near-instantaneous register or atomic loads; none
//! of these calls may block on I/O.

pub mod joystick;

use std::sync::Arc;

use crate::error::SensorError;

pub use joystick::{
    ArcadeAxes, ArcadeJoystickSource, AxisId, AxisInput, JoystickShaping, TankAxes,
    TankJoystickSource,
};

/// Absolute heading in radians, wrapped or unwrapped.
pub trait HeadingSensor {
    fn read_heading(&self) -> Result<f64, SensorError>;
}

/// Yaw rate in radians per second.
pub trait TurnRateSensor {
    fn read_turn_rate(&self) -> Result<f64, SensorError>;
}

impl<T: HeadingSensor + ?Sized> HeadingSensor for Arc<T> {
    fn read_heading(&self) -> Result<f64, SensorError> {
        (**self).read_heading()
    }
}

impl<T: HeadingSensor + ?Sized> HeadingSensor for &T {
    fn read_heading(&self) -> Result<f64, SensorError> {
        (**self).read_heading()
    }
}

impl<T: TurnRateSensor + ?Sized> TurnRateSensor for Arc<T> {
    fn read_turn_rate(&self) -> Result<f64, SensorError> {
        (**self).read_turn_rate()
    }
}

impl<T: TurnRateSensor + ?Sized> TurnRateSensor for &T {
    fn read_turn_rate(&self) -> Result<f64, SensorError> {
        (**self).read_turn_rate()
    }
}

/// Adapts a closure into either sensor.
#[derive(Clone)]
pub struct FnSensor<F>(F);

pub fn sensor_fn<F>(f: F) -> FnSensor<F>
where
    F: Fn() -> Result<f64, SensorError>,
{
    FnSensor(f)
}

impl<F> HeadingSensor for FnSensor<F>
where
    F: Fn() -> Result<f64, SensorError>,
{
    fn read_heading(&self) -> Result<f64, SensorError> {
        (self.0)()
    }
}

impl<F> TurnRateSensor for FnSensor<F>
where
    F: Fn() -> Result<f64, SensorError>,
{
    fn read_turn_rate(&self) -> Result<f64, SensorError> {
        (self.0)()
    }
}
