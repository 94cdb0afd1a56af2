use std::f64::consts::{PI, TAU};
use std::time::Duration;

use super::pid::{apply_turn_correction, PidController, PidGains, PidTelemetry};
use crate::data::TankDriveData;
use crate::error::{BuildError, SensorError, TickError};
use crate::pipeline::Stage;
use crate::sensor::HeadingSensor;

/// Wraps an angle difference into `(-pi, pi]`, the signed shortest arc.
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Closed-loop heading hold.
///
/// Active only while `heading_setpoint` is present. The correction is written
/// differentially onto the sides; the turn-rate setpoint is left untouched.
///
/// When the setpoint is absent the record passes through unchanged and the
/// accumulator is reset, so re-engaging never starts from stale windup. A
/// non-finite setpoint fails the tick and leaves the controller untouched.
pub struct HeadingPidStage<H> {
    sensor: H,
    pid: PidController,
    invert_sides: bool,
    telemetry: PidTelemetry,
}

impl<H: HeadingSensor> HeadingPidStage<H> {
    pub fn new(
        gains: PidGains,
        dt: Duration,
        sensor: H,
        invert_sides: bool,
    ) -> Result<Self, BuildError> {
        Ok(Self {
            sensor,
            pid: PidController::new(gains, dt)?,
            invert_sides,
            telemetry: PidTelemetry::default(),
        })
    }

    /// Last computed heading error in radians.
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

impl<H: HeadingSensor> Stage<TankDriveData> for HeadingPidStage<H> {
    type Output = TankDriveData;

    fn apply(&mut self, data: TankDriveData) -> Result<TankDriveData, TickError> {
        let Some(setpoint) = data.heading_setpoint else {
            self.pid.reset();
            self.telemetry.publish(&self.pid, 0.0, false);
            return Ok(data);
        };
        if !setpoint.is_finite() {
            return Err(TickError::Stage {
                stage: "heading",
                reason: format!("non-finite setpoint {}", setpoint),
            });
        }

        let heading = self.sensor.read_heading()?;
        if !heading.is_finite() {
            return Err(SensorError::NonFinite {
                name: "heading",
                value: heading,
            }
            .into());
        }

        let error = normalize_angle(setpoint - heading);
        let output = self.pid.compute(error);
        self.telemetry.publish(&self.pid, output, true);

        Ok(apply_turn_correction(data, output, self.invert_sides))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keeps_small_angles() {
        assert_eq!(normalize_angle(0.0), 0.0);
        assert!((normalize_angle(0.2) - 0.2).abs() < 1e-12);
        assert!((normalize_angle(-0.2) + 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_boundaries() {
        assert_eq!(normalize_angle(PI), PI);
        assert!((normalize_angle(-PI) - PI).abs() < 1e-12);
        assert_eq!(normalize_angle(-1e-18), 0.0);
        let odd = normalize_angle(3.0 * PI);
        assert!(odd > -PI && odd <= PI);
        assert!((odd.abs() - PI).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_takes_short_arc() {
        // -3.0 - 3.0 = -6.0, short arc is 2pi - 6
        let err = normalize_angle(-3.0 - 3.0);
        assert!((err - (TAU - 6.0)).abs() < 1e-12);
    }
}
