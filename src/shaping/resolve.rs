use crate::data::{DriveData, TankDriveData};
use crate::error::TickError;
use crate::pipeline::Stage;

/// Fills absent side values with a safe default before they reach a sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveAbsentStage {
    default: f64,
}

impl ResolveAbsentStage {
    /// Resolves to zero output.
    pub fn zero() -> Self {
        Self { default: 0.0 }
    }

    pub fn with_default(default: f64) -> Self {
        Self { default }
    }
}

impl Default for ResolveAbsentStage {
    fn default() -> Self {
        Self::zero()
    }
}

impl Stage<DriveData> for ResolveAbsentStage {
    type Output = DriveData;

    fn apply(&mut self, input: DriveData) -> Result<DriveData, TickError> {
        Ok(DriveData {
            value: Some(input.value.unwrap_or(self.default)),
            ..input
        })
    }
}

impl Stage<TankDriveData> for ResolveAbsentStage {
    type Output = TankDriveData;

    fn apply(&mut self, input: TankDriveData) -> Result<TankDriveData, TickError> {
        Ok(TankDriveData {
            left: Stage::<DriveData>::apply(self, input.left)?,
            right: Stage::<DriveData>::apply(self, input.right)?,
            ..input
        })
    }
}
