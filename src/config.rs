//! Pipeline configuration.
//!
//! Values are read once per build and captured by value into the assembled
//! pipeline. Sources: a TOML file ([`load_config`]) or a live key/value
//! preference store ([`PipelineConfig::from_store`]).

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Deserialize;

use crate::actuator::ActuatorConfig;
use crate::control::PidGains;
use crate::error::{BuildError, ConfigError};
use crate::shaping::FeedForwardGains;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub period_ms: u64,
    /// Drive outputs to zero after a failed tick.
    pub fail_safe_enabled: bool,
    pub invert_sides: bool,
    /// Heading held by the heading-hold pipeline, radians.
    pub heading_setpoint: f64,
    /// Turn rate held by the turn-rate pipeline, radians per second.
    pub turn_rate_setpoint: f64,
    pub heading: PidGains,
    pub turn_rate: PidGains,
    pub drive: DriveConfig,
    pub feed_forward: FeedForwardGains,
    pub joystick: JoystickConfig,
    pub actuator: ActuatorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            period_ms: 20,
            fail_safe_enabled: true,
            invert_sides: false,
            heading_setpoint: 0.0,
            turn_rate_setpoint: 0.0,
            heading: PidGains::default(),
            turn_rate: PidGains::default(),
            drive: DriveConfig::default(),
            feed_forward: FeedForwardGains::default(),
            joystick: JoystickConfig::default(),
            actuator: ActuatorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Top speed in physical units per second.
    pub max_velocity: f64,
    /// Distance between left and right wheels, same length unit as velocity.
    pub track_width: f64,
    /// Actuator-native units per physical unit.
    pub ticks_per_unit: f64,
    /// Commands smaller than this magnitude are zeroed before scaling.
    pub deadband: f64,
    /// Flip soft turning while backing up, like steering a car in reverse.
    pub reverse_backwards: bool,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            max_velocity: 1.0,
            track_width: 1.0,
            ticks_per_unit: 1.0,
            deadband: 0.0,
            reverse_backwards: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct JoystickConfig {
    pub deadzone: f64,
    /// Gain applied after the deadzone.
    pub power: f64,
    /// Stretch the range outside the deadzone back to full scale.
    pub rescale: bool,
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            deadzone: 0.1,
            power: 1.0,
            rescale: true,
        }
    }
}

impl PipelineConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if self.period_ms == 0 {
            return Err(BuildError::ZeroPeriod);
        }
        self.heading.validate()?;
        self.turn_rate.validate()?;
        self.feed_forward.validate()?;

        let setpoints = [
            ("heading_setpoint", self.heading_setpoint),
            ("turn_rate_setpoint", self.turn_rate_setpoint),
        ];
        for (key, value) in setpoints {
            if !value.is_finite() {
                return Err(BuildError::InvalidConfig {
                    key,
                    value,
                    reason: "must be finite",
                });
            }
        }

        let positive = [
            ("max_velocity", self.drive.max_velocity),
            ("track_width", self.drive.track_width),
            ("ticks_per_unit", self.drive.ticks_per_unit),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(BuildError::InvalidConfig {
                    key,
                    value,
                    reason: "must be positive",
                });
            }
        }
        if !(self.drive.deadband >= 0.0) {
            return Err(BuildError::InvalidConfig {
                key: "deadband",
                value: self.drive.deadband,
                reason: "must be non-negative",
            });
        }
        if !(0.0..1.0).contains(&self.joystick.deadzone) {
            return Err(BuildError::InvalidConfig {
                key: "deadzone",
                value: self.joystick.deadzone,
                reason: "must be within [0, 1)",
            });
        }
        if !self.joystick.power.is_finite() {
            return Err(BuildError::InvalidConfig {
                key: "power",
                value: self.joystick.power,
                reason: "must be finite",
            });
        }
        self.actuator.validate()
    }

    /// Overlays values found in `store` on top of `self`.
    ///
    /// Key names follow the robot preference store: `p`, `i`, `d` set both
    /// loop gain sets, `maxVelocity`, `trackWidth`, `ticksPerUnit` (or `tpu`),
    /// `power`, `invertSides`, `ramp`, and so on. Unknown keys are ignored.
    pub fn overlay(mut self, store: &dyn ConfigStore) -> Result<Self, ConfigError> {
        if let Some(p) = number(store, "p")? {
            self.heading.p = p;
            self.turn_rate.p = p;
        }
        if let Some(i) = number(store, "i")? {
            self.heading.i = i;
            self.turn_rate.i = i;
        }
        if let Some(d) = number(store, "d")? {
            self.heading.d = d;
            self.turn_rate.d = d;
        }
        if let Some(limit) = number(store, "iLimit")? {
            self.heading.integral_limit = limit;
            self.turn_rate.integral_limit = limit;
        }
        if let Some(limit) = number(store, "outputLimit")? {
            self.heading.output_limit = limit;
            self.turn_rate.output_limit = limit;
        }

        set_number(store, "hdgSet", &mut self.heading_setpoint)?;
        set_number(store, "turnSet", &mut self.turn_rate_setpoint)?;
        set_number(store, "maxVelocity", &mut self.drive.max_velocity)?;
        set_number(store, "trackWidth", &mut self.drive.track_width)?;
        set_number(store, "tpu", &mut self.drive.ticks_per_unit)?;
        set_number(store, "ticksPerUnit", &mut self.drive.ticks_per_unit)?;
        set_number(store, "deadband", &mut self.drive.deadband)?;
        set_number(store, "deadzone", &mut self.joystick.deadzone)?;
        set_number(store, "power", &mut self.joystick.power)?;
        set_number(store, "kV", &mut self.feed_forward.kv)?;
        set_number(store, "kA", &mut self.feed_forward.ka)?;
        set_number(store, "kS", &mut self.feed_forward.ks)?;
        set_number(store, "ramp", &mut self.actuator.ramp)?;
        set_flag(store, "invertSides", &mut self.invert_sides)?;
        set_flag(store, "revBack", &mut self.drive.reverse_backwards)?;
        set_flag(store, "failSafe", &mut self.fail_safe_enabled)?;

        if let Some(period) = number(store, "periodMs")? {
            if !(period.is_finite() && period >= 0.0) {
                return Err(ConfigError::WrongType {
                    key: "periodMs".to_string(),
                    found: period.to_string(),
                    expected: "non-negative number of milliseconds",
                });
            }
            self.period_ms = period.round() as u64;
        }
        Ok(self)
    }

    /// Defaults overlaid with `store`.
    pub fn from_store(store: &dyn ConfigStore) -> Result<Self, ConfigError> {
        Self::default().overlay(store)
    }
}

/// Loads a TOML config; a missing file yields the defaults.
pub fn load_config(path: &str) -> Result<PipelineConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(s) => parse_config(&s).map_err(|e| match e {
            ConfigError::Parse { reason, .. } => ConfigError::Parse {
                path: path.to_string(),
                reason,
            },
            other => other,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path, "config file not found, using defaults");
            Ok(PipelineConfig::default())
        }
        Err(e) => Err(ConfigError::Io {
            path: path.to_string(),
            reason: e.to_string(),
        }),
    }
}

pub fn parse_config(s: &str) -> Result<PipelineConfig, ConfigError> {
    toml::from_str::<PipelineConfig>(s).map_err(|e| ConfigError::Parse {
        path: "<inline>".to_string(),
        reason: e.to_string(),
    })
}

// ============================================================================
// PREFERENCE STORE - key/value tuning values readable at rebuild time
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigValue {
    Number(f64),
    Flag(bool),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Number(n) => write!(f, "{}", n),
            ConfigValue::Flag(b) => write!(f, "{}", b),
        }
    }
}

pub trait ConfigStore {
    fn get(&self, key: &str) -> Option<ConfigValue>;
}

/// In-memory, ephemeral store. Safe to write from the host thread while a
/// rebuild reads it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, ConfigValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_number(&self, key: &str, value: f64) {
        self.values
            .write()
            .insert(key.to_string(), ConfigValue::Number(value));
    }

    pub fn set_flag(&self, key: &str, value: bool) {
        self.values
            .write()
            .insert(key.to_string(), ConfigValue::Flag(value));
    }

    pub fn remove(&self, key: &str) {
        self.values.write().remove(key);
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.read().get(key).copied()
    }
}

fn number(store: &dyn ConfigStore, key: &str) -> Result<Option<f64>, ConfigError> {
    match store.get(key) {
        None => Ok(None),
        Some(ConfigValue::Number(n)) => Ok(Some(n)),
        Some(other) => Err(ConfigError::WrongType {
            key: key.to_string(),
            found: other.to_string(),
            expected: "number",
        }),
    }
}

fn set_number(store: &dyn ConfigStore, key: &str, slot: &mut f64) -> Result<(), ConfigError> {
    if let Some(n) = number(store, key)? {
        *slot = n;
    }
    Ok(())
}

fn set_flag(store: &dyn ConfigStore, key: &str, slot: &mut bool) -> Result<(), ConfigError> {
    match store.get(key) {
        None => {}
        Some(ConfigValue::Flag(b)) => *slot = b,
        Some(other) => {
            return Err(ConfigError::WrongType {
                key: key.to_string(),
                found: other.to_string(),
                expected: "boolean",
            })
        }
    }
    Ok(())
}
