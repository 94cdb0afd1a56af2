//! Ready-made drive pipelines assembled from a config snapshot.
//!
//! Every factory validates what it captures, so a bad snapshot fails the
//! build instead of the first tick.

use crate::actuator::{ActuatorDriver, ActuatorSink};
use crate::config::PipelineConfig;
use crate::control::{HeadingPidStage, TurnRatePidStage};
use crate::data::{DriveData, TankDriveData};
use crate::drive_loop::BoxedTask;
use crate::error::BuildError;
use crate::ipc::LiveValue;
use crate::pipeline::{source_fn, Source};
use crate::sensor::{
    ArcadeAxes, ArcadeJoystickSource, AxisInput, HeadingSensor, JoystickShaping, TurnRateSensor,
};
use crate::shaping::{FeedForwardStage, ResolveAbsentStage, UnitScalerStage};

/// Live inputs of the heading-hold pipeline, written by the host.
///
/// A non-finite setpoint disengages the heading loop.
#[derive(Debug, Clone, Default)]
pub struct HeadingTargets {
    pub setpoint: LiveValue,
    pub throttle: LiveValue,
}

impl HeadingTargets {
    pub fn new(setpoint: f64, throttle: f64) -> Self {
        Self {
            setpoint: LiveValue::new(setpoint),
            throttle: LiveValue::new(throttle),
        }
    }

    pub fn disengage(&self) {
        self.setpoint.set(f64::NAN);
    }
}

/// Throttle plus heading hold:
/// `targets -> heading PID -> feed-forward -> unit scaler -> resolve -> actuators`.
pub fn heading_hold<H, D>(
    config: &PipelineConfig,
    targets: HeadingTargets,
    sensor: H,
    driver: D,
) -> Result<BoxedTask, BuildError>
where
    H: HeadingSensor + Send + 'static,
    D: ActuatorDriver + Send + 'static,
{
    config.validate()?;

    let source = source_fn(move || {
        let throttle = targets.throttle.get();
        let data = TankDriveData::new(DriveData::new(throttle), DriveData::new(throttle));
        let setpoint = targets.setpoint.get();
        if setpoint.is_finite() {
            data.with_heading(setpoint)
        } else {
            data
        }
    });

    let task = source
        .then(HeadingPidStage::new(
            config.heading,
            config.period(),
            sensor,
            config.invert_sides,
        )?)
        .then(FeedForwardStage::from_gains(config.feed_forward))
        .then(UnitScalerStage::new(
            config.drive.ticks_per_unit,
            config.drive.deadband,
        )?)
        .then(ResolveAbsentStage::zero())
        .into_sink(ActuatorSink::new(driver, &config.actuator));
    Ok(Box::new(task))
}

/// Arcade joystick with turn-rate feedback:
/// `arcade -> turn-rate PID -> feed-forward -> unit scaler -> resolve -> actuators`.
pub fn arcade_drive<I, G, D>(
    config: &PipelineConfig,
    input: I,
    axes: ArcadeAxes,
    gyro: G,
    driver: D,
) -> Result<BoxedTask, BuildError>
where
    I: AxisInput + Send + 'static,
    G: TurnRateSensor + Send + 'static,
    D: ActuatorDriver + Send + 'static,
{
    config.validate()?;

    let shaping = JoystickShaping::from_config(&config.joystick)?;
    let task = ArcadeJoystickSource::new(input, axes, shaping, &config.drive)?
        .then(TurnRatePidStage::new(
            config.turn_rate,
            config.period(),
            gyro,
            config.invert_sides,
        )?)
        .then(FeedForwardStage::from_gains(config.feed_forward))
        .then(UnitScalerStage::new(
            config.drive.ticks_per_unit,
            config.drive.deadband,
        )?)
        .then(ResolveAbsentStage::zero())
        .into_sink(ActuatorSink::new(driver, &config.actuator));
    Ok(Box::new(task))
}
