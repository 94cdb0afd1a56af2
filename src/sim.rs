//! In-process differential drivetrain for demos and closed-loop tests.
//!
//! [`SimulatedDrivetrain`] is the actuator driver and both sensors at once.
//! Physics advance by one `dt` each time both sides have been commanded, so a
//! pipeline ticking against it sees one step per tick regardless of wall time.

use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::actuator::{ActuatorConfig, ActuatorDriver, ControlMode, DeviceHandle};
use crate::error::{ActuatorError, SensorError};
use crate::sensor::{AxisId, AxisInput, HeadingSensor, TurnRateSensor};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Wheel speed at full percent output.
    pub max_speed: f64,
    pub track_width: f64,
    /// Seconds of simulated time per commanded pair.
    pub dt: f64,
    /// Uniform noise amplitude added to heading and turn-rate readings.
    pub noise: f64,
    pub seed: u64,
    pub initial_heading: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_speed: 1.0,
            track_width: 0.5,
            dt: 0.02,
            noise: 0.0,
            seed: 42,
            initial_heading: 0.0,
        }
    }
}

struct SimState {
    rng: StdRng,
    left_speed: f64,
    right_speed: f64,
    left_written: bool,
    right_written: bool,
    heading: f64,
    turn_rate: f64,
    steps: u64,
    failed_device: Option<DeviceHandle>,
    sensor_offline: bool,
}

pub struct SimulatedDrivetrain {
    config: SimConfig,
    left: DeviceHandle,
    right: DeviceHandle,
    state: Mutex<SimState>,
}

impl SimulatedDrivetrain {
    pub fn new(config: SimConfig, devices: &ActuatorConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            left: devices.left_device,
            right: devices.right_device,
            state: Mutex::new(SimState {
                rng: StdRng::seed_from_u64(config.seed),
                left_speed: 0.0,
                right_speed: 0.0,
                left_written: false,
                right_written: false,
                heading: config.initial_heading,
                turn_rate: 0.0,
                steps: 0,
                failed_device: None,
                sensor_offline: false,
            }),
        })
    }

    /// True (noise-free) heading, unwrapped.
    pub fn heading(&self) -> f64 {
        self.state.lock().heading
    }

    pub fn set_heading(&self, heading: f64) {
        self.state.lock().heading = heading;
    }

    pub fn turn_rate(&self) -> f64 {
        self.state.lock().turn_rate
    }

    /// Last wheel speeds, left then right.
    pub fn wheel_speeds(&self) -> (f64, f64) {
        let state = self.state.lock();
        (state.left_speed, state.right_speed)
    }

    pub fn steps(&self) -> u64 {
        self.state.lock().steps
    }

    /// Makes every write to `device` time out until cleared with `None`.
    pub fn fail_device(&self, device: Option<DeviceHandle>) {
        self.state.lock().failed_device = device;
    }

    pub fn set_sensor_offline(&self, offline: bool) {
        self.state.lock().sensor_offline = offline;
    }

    fn noise(&self, rng: &mut StdRng) -> f64 {
        if self.config.noise > 0.0 {
            rng.gen_range(-self.config.noise..=self.config.noise)
        } else {
            0.0
        }
    }

    fn step(&self, state: &mut SimState) {
        state.turn_rate = (state.right_speed - state.left_speed) / self.config.track_width;
        state.heading += state.turn_rate * self.config.dt;
        state.steps += 1;
        state.left_written = false;
        state.right_written = false;
    }
}

impl ActuatorDriver for SimulatedDrivetrain {
    fn set(&self, device: DeviceHandle, mode: ControlMode, value: f64) -> Result<(), ActuatorError> {
        let mut state = self.state.lock();
        if state.failed_device == Some(device) {
            return Err(ActuatorError::Timeout(device));
        }
        if !value.is_finite() {
            return Err(ActuatorError::Rejected {
                device,
                mode,
                value,
            });
        }

        let speed = match mode {
            ControlMode::PercentOutput => value.clamp(-1.0, 1.0) * self.config.max_speed,
            ControlMode::Velocity => value,
        };
        if device == self.left {
            state.left_speed = speed;
            state.left_written = true;
        } else if device == self.right {
            state.right_speed = speed;
            state.right_written = true;
        } else {
            return Err(ActuatorError::UnknownDevice(device));
        }

        if state.left_written && state.right_written {
            self.step(&mut state);
        }
        Ok(())
    }
}

impl HeadingSensor for SimulatedDrivetrain {
    fn read_heading(&self) -> Result<f64, SensorError> {
        let mut state = self.state.lock();
        if state.sensor_offline {
            return Err(SensorError::NotResponding("gyro"));
        }
        let heading = state.heading;
        Ok(heading + self.noise(&mut state.rng))
    }
}

impl TurnRateSensor for SimulatedDrivetrain {
    fn read_turn_rate(&self) -> Result<f64, SensorError> {
        let mut state = self.state.lock();
        if state.sensor_offline {
            return Err(SensorError::NotResponding("gyro"));
        }
        let rate = state.turn_rate;
        Ok(rate + self.noise(&mut state.rng))
    }
}

const AXIS_COUNT: usize = 8;

/// Joystick whose axes are set from the host thread.
#[derive(Clone, Default)]
pub struct VirtualJoystick {
    axes: Arc<[AtomicCell<f64>; AXIS_COUNT]>,
}

impl VirtualJoystick {
    pub fn new() -> Self {
        Self::default()
    }

    /// Out-of-range axes are ignored.
    pub fn set_axis(&self, axis: AxisId, value: f64) {
        if let Some(cell) = self.axes.get(axis as usize) {
            cell.store(value.clamp(-1.0, 1.0));
        }
    }
}

impl AxisInput for VirtualJoystick {
    fn read_axis(&self, axis: AxisId) -> f64 {
        self.axes.get(axis as usize).map_or(0.0, |cell| cell.load())
    }
}
