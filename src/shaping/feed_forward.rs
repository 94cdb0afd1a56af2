use serde::Deserialize;

use crate::data::{DriveData, TankDriveData};
use crate::error::{BuildError, TickError};
use crate::pipeline::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedForwardGains {
    /// Output per unit of velocity.
    pub kv: f64,
    /// Output per unit of acceleration.
    pub ka: f64,
    /// Static friction offset, applied in the direction of motion.
    pub ks: f64,
}

impl Default for FeedForwardGains {
    fn default() -> Self {
        Self {
            kv: 1.0,
            ka: 0.0,
            ks: 0.0,
        }
    }
}

impl FeedForwardGains {
    pub fn validate(&self) -> Result<(), BuildError> {
        for (key, value) in [("kv", self.kv), ("ka", self.ka), ("ks", self.ks)] {
            if !value.is_finite() {
                return Err(BuildError::InvalidConfig {
                    key,
                    value,
                    reason: "gain must be finite",
                });
            }
        }
        Ok(())
    }
}

/// Open-loop `kV*v + kA*a + kS*sign(v)`.
///
/// Stateless and never short-circuits: an absent value is treated as `0.0`,
/// so the output of this stage is always resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedForwardStage {
    gains: FeedForwardGains,
}

impl FeedForwardStage {
    pub fn new(kv: f64, ka: f64, ks: f64) -> Self {
        Self {
            gains: FeedForwardGains { kv, ka, ks },
        }
    }

    pub fn from_gains(gains: FeedForwardGains) -> Self {
        Self { gains }
    }

    pub fn compute(&self, value: f64, acceleration: f64) -> f64 {
        // f64::signum(0.0) is 1.0
        let sign = if value == 0.0 { 0.0 } else { value.signum() };
        self.gains.kv * value + self.gains.ka * acceleration + self.gains.ks * sign
    }
}

impl Stage<f64> for FeedForwardStage {
    type Output = f64;

    fn apply(&mut self, input: f64) -> Result<f64, TickError> {
        Ok(self.compute(input, 0.0))
    }
}

impl Stage<DriveData> for FeedForwardStage {
    type Output = DriveData;

    fn apply(&mut self, input: DriveData) -> Result<DriveData, TickError> {
        let value = self.compute(
            input.value.unwrap_or(0.0),
            input.acceleration.unwrap_or(0.0),
        );
        Ok(DriveData {
            value: Some(value),
            ..input
        })
    }
}

impl Stage<TankDriveData> for FeedForwardStage {
    type Output = TankDriveData;

    fn apply(&mut self, input: TankDriveData) -> Result<TankDriveData, TickError> {
        Ok(TankDriveData {
            left: Stage::<DriveData>::apply(self, input.left)?,
            right: Stage::<DriveData>::apply(self, input.right)?,
            ..input
        })
    }
}
