use std::time::Duration;

use super::pid::{apply_turn_correction, PidController, PidGains, PidTelemetry};
use crate::data::TankDriveData;
use crate::error::{BuildError, SensorError, TickError};
use crate::pipeline::Stage;
use crate::sensor::TurnRateSensor;

/// Closed-loop turn rate control against a rate gyro.
///
/// Same contract as the heading stage, driven by `turn_rate_setpoint`. Rate
/// has no periodic domain so the error is used as-is.
pub struct TurnRatePidStage<G> {
    sensor: G,
    pid: PidController,
    invert_sides: bool,
    telemetry: PidTelemetry,
}

impl<G: TurnRateSensor> TurnRatePidStage<G> {
    pub fn new(
        gains: PidGains,
        dt: Duration,
        sensor: G,
        invert_sides: bool,
    ) -> Result<Self, BuildError> {
        Ok(Self {
            sensor,
            pid: PidController::new(gains, dt)?,
            invert_sides,
            telemetry: PidTelemetry::default(),
        })
    }

    /// Last computed rate error in radians per second.
    pub fn error(&self) -> f64 {
        self.pid.error()
    }

    pub fn integral(&self) -> f64 {
        self.pid.integral()
    }

    pub fn telemetry(&self) -> PidTelemetry {
        self.telemetry.clone()
    }
}

impl<G: TurnRateSensor> Stage<TankDriveData> for TurnRatePidStage<G> {
    type Output = TankDriveData;

    fn apply(&mut self, data: TankDriveData) -> Result<TankDriveData, TickError> {
        let Some(setpoint) = data.turn_rate_setpoint else {
            self.pid.reset();
            self.telemetry.publish(&self.pid, 0.0, false);
            return Ok(data);
        };
        if !setpoint.is_finite() {
            return Err(TickError::Stage {
                stage: "turn rate",
                reason: format!("non-finite setpoint {}", setpoint),
            });
        }

        let rate = self.sensor.read_turn_rate()?;
        if !rate.is_finite() {
            return Err(SensorError::NonFinite {
                name: "turn rate",
                value: rate,
            }
            .into());
        }

        let output = self.pid.compute(setpoint - rate);
        self.telemetry.publish(&self.pid, output, true);

        Ok(apply_turn_correction(data, output, self.invert_sides))
    }
}
