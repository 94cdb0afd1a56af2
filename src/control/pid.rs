use std::sync::Arc;
use std::time::Duration;

use crossbeam::atomic::AtomicCell;
use serde::Deserialize;

use crate::data::TankDriveData;
use crate::error::BuildError;

/// Gain set for one PID loop, captured by value at pipeline build time.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PidGains {
    pub p: f64,
    pub i: f64,
    pub d: f64,
    /// Magnitude bound on the integral accumulator.
    pub integral_limit: f64,
    /// Magnitude bound on the controller output.
    pub output_limit: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            p: 0.0,
            i: 0.0,
            d: 0.0,
            integral_limit: f64::INFINITY,
            output_limit: f64::INFINITY,
        }
    }
}

impl PidGains {
    pub fn new(p: f64, i: f64, d: f64) -> Self {
        Self {
            p,
            i,
            d,
            ..Self::default()
        }
    }

    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = limit;
        self
    }

    pub fn with_output_limit(mut self, limit: f64) -> Self {
        self.output_limit = limit;
        self
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        let finite = [("p", self.p), ("i", self.i), ("d", self.d)];
        for (key, value) in finite {
            if !value.is_finite() {
                return Err(BuildError::InvalidConfig {
                    key,
                    value,
                    reason: "gain must be finite",
                });
            }
        }
        if self.integral_limit.is_nan() || self.integral_limit < 0.0 {
            return Err(BuildError::InvalidConfig {
                key: "integral_limit",
                value: self.integral_limit,
                reason: "must be non-negative",
            });
        }
        if self.output_limit.is_nan() || self.output_limit <= 0.0 {
            return Err(BuildError::InvalidConfig {
                key: "output_limit",
                value: self.output_limit,
                reason: "must be positive",
            });
        }
        Ok(())
    }
}

/// Discrete PID with a fixed time step.
///
/// Anti-windup is two-fold: the accumulator is clamped to `integral_limit`,
/// and integration is skipped while the previous output was saturated in the
/// direction the error would push it.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    dt: f64,

    integral: f64,
    prev_error: Option<f64>,
    last_error: f64,
    // Sign of the last saturated output, 0.0 when unsaturated
    saturation: f64,
}

impl PidController {
    /// Fails for gains `PidGains::validate` rejects.
    pub fn new(gains: PidGains, dt: Duration) -> Result<Self, BuildError> {
        gains.validate()?;
        Ok(Self {
            gains,
            dt: dt.as_secs_f64(),
            integral: 0.0,
            prev_error: None,
            last_error: 0.0,
            saturation: 0.0,
        })
    }

    pub fn compute(&mut self, error: f64) -> f64 {
        self.last_error = error;

        // No previous error on the first tick after a reset
        let derivative = match self.prev_error {
            Some(prev) if self.dt > 0.0 => (error - prev) / self.dt,
            _ => 0.0,
        };

        let winding_up = self.saturation != 0.0 && error.signum() == self.saturation;
        if !winding_up {
            let limit = self.gains.integral_limit;
            self.integral = (self.integral + error * self.dt).clamp(-limit, limit);
        }

        let raw = self.gains.p * error + self.gains.i * self.integral + self.gains.d * derivative;
        let limit = self.gains.output_limit;
        let output = raw.clamp(-limit, limit);
        self.saturation = if raw.abs() > limit { raw.signum() } else { 0.0 };

        self.prev_error = Some(error);
        output
    }

    pub fn error(&self) -> f64 {
        self.last_error
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
        self.last_error = 0.0;
        self.saturation = 0.0;
    }
}

/// Host-readable view of a PID stage running on the pipeline thread.
///
/// Written only by the owning stage; cloning shares the same cells.
#[derive(Debug, Clone, Default)]
pub struct PidTelemetry {
    cells: Arc<TelemetryCells>,
}

#[derive(Debug, Default)]
struct TelemetryCells {
    error: AtomicCell<f64>,
    integral: AtomicCell<f64>,
    output: AtomicCell<f64>,
    active: AtomicCell<bool>,
}

impl PidTelemetry {
    pub fn error(&self) -> f64 {
        self.cells.error.load()
    }

    pub fn integral(&self) -> f64 {
        self.cells.integral.load()
    }

    pub fn output(&self) -> f64 {
        self.cells.output.load()
    }

    /// Whether the last tick had a setpoint to track.
    pub fn is_active(&self) -> bool {
        self.cells.active.load()
    }

    pub(crate) fn publish(&self, pid: &PidController, output: f64, active: bool) {
        self.cells.error.store(pid.error());
        self.cells.integral.store(pid.integral());
        self.cells.output.store(output);
        self.cells.active.store(active);
    }
}

/// Writes `output` as a symmetric turning correction on top of whatever the
/// sides already carry: `left -= output`, `right += output`, or the reverse
/// when `invert_sides` is set. Absent sides start from zero.
pub fn apply_turn_correction(data: TankDriveData, output: f64, invert_sides: bool) -> TankDriveData {
    let output = if invert_sides { -output } else { output };
    TankDriveData {
        left: data.left.offset(-output),
        right: data.right.offset(output),
        ..data
    }
}
