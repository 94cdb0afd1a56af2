use crate::data::{DriveData, TankDriveData};
use crate::error::{BuildError, TickError};
use crate::pipeline::Stage;

/// Converts physical units into actuator-native units.
///
/// Magnitudes below `deadband` (measured in physical units) become exactly
/// zero to keep motors from buzzing near the setpoint. Because of that,
/// [`UnitScalerStage::inverse`] only recovers inputs at or above the deadband.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitScalerStage {
    ticks_per_unit: f64,
    deadband: f64,
}

impl UnitScalerStage {
    pub fn new(ticks_per_unit: f64, deadband: f64) -> Result<Self, BuildError> {
        if !(ticks_per_unit.is_finite() && ticks_per_unit > 0.0) {
            return Err(BuildError::InvalidConfig {
                key: "ticks_per_unit",
                value: ticks_per_unit,
                reason: "must be positive",
            });
        }
        if !(deadband >= 0.0) {
            return Err(BuildError::InvalidConfig {
                key: "deadband",
                value: deadband,
                reason: "must be non-negative",
            });
        }
        Ok(Self {
            ticks_per_unit,
            deadband,
        })
    }

    pub fn scale(&self, value: f64) -> f64 {
        if value.abs() < self.deadband {
            0.0
        } else {
            value * self.ticks_per_unit
        }
    }

    pub fn inverse(&self, native: f64) -> f64 {
        native / self.ticks_per_unit
    }

    pub fn ticks_per_unit(&self) -> f64 {
        self.ticks_per_unit
    }

    pub fn deadband(&self) -> f64 {
        self.deadband
    }
}

impl Stage<f64> for UnitScalerStage {
    type Output = f64;

    fn apply(&mut self, input: f64) -> Result<f64, TickError> {
        Ok(self.scale(input))
    }
}

impl Stage<DriveData> for UnitScalerStage {
    type Output = DriveData;

    fn apply(&mut self, input: DriveData) -> Result<DriveData, TickError> {
        let tpu = self.ticks_per_unit;
        Ok(DriveData {
            value: input.value.map(|v| self.scale(v)),
            acceleration: input.acceleration.map(|a| a * tpu),
        })
    }
}

impl Stage<TankDriveData> for UnitScalerStage {
    type Output = TankDriveData;

    fn apply(&mut self, input: TankDriveData) -> Result<TankDriveData, TickError> {
        Ok(TankDriveData {
            left: Stage::<DriveData>::apply(self, input.left)?,
            right: Stage::<DriveData>::apply(self, input.right)?,
            ..input
        })
    }
}
