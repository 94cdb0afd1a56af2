use tracing::warn;

use super::{ActuatorConfig, ActuatorDriver, ControlMode, DeviceHandle};
use crate::data::{Side, TankDriveData};
use crate::error::TickError;
use crate::pipeline::Sink;

/// Writes a resolved left/right command pair to two motor controllers.
///
/// Each side is written independently, so a failure on one side never keeps
/// the other from being commanded. A side that arrives without a value (or
/// with a non-finite one) is driven to zero and reported.
pub struct ActuatorSink<D> {
    driver: D,
    left: DeviceHandle,
    right: DeviceHandle,
    mode: ControlMode,
}

impl<D: ActuatorDriver> ActuatorSink<D> {
    pub fn new(driver: D, config: &ActuatorConfig) -> Self {
        for device in [config.left_device, config.right_device] {
            if let Err(e) = driver.configure_ramp(device, config.ramp) {
                warn!(%device, error = %e, "failed to configure ramp");
            }
        }
        Self {
            driver,
            left: config.left_device,
            right: config.right_device,
            mode: config.mode,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    fn device(&self, side: Side) -> DeviceHandle {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    fn write(&self, side: Side, value: Option<f64>) -> Result<(), TickError> {
        let device = self.device(side);
        let command = match value {
            Some(v) if v.is_finite() => v,
            _ => 0.0,
        };
        self.driver
            .set(device, self.mode, command)
            .map_err(|source| TickError::Actuator { side, source })?;

        match value {
            Some(v) if v.is_finite() => Ok(()),
            Some(v) => Err(TickError::NonFiniteCommand { side, value: v }),
            None => Err(TickError::UnresolvedCommand(side)),
        }
    }

    fn write_pair(&self, left: Option<f64>, right: Option<f64>) -> Result<(), TickError> {
        let left = self.write(Side::Left, left);
        let right = self.write(Side::Right, right);
        combine(left, right)
    }
}

fn combine(left: Result<(), TickError>, right: Result<(), TickError>) -> Result<(), TickError> {
    match (left, right) {
        (Ok(()), Ok(())) => Ok(()),
        (
            Err(TickError::Actuator { source: left, .. }),
            Err(TickError::Actuator { source: right, .. }),
        ) => Err(TickError::BothActuators { left, right }),
        (Err(e), _) | (Ok(()), Err(e)) => Err(e),
    }
}

impl<D: ActuatorDriver> Sink<TankDriveData> for ActuatorSink<D> {
    fn consume(&mut self, input: TankDriveData) -> Result<(), TickError> {
        self.write_pair(input.left.value, input.right.value)
    }

    fn fail_safe(&mut self) -> Result<(), TickError> {
        self.write_pair(Some(0.0), Some(0.0))
    }
}
