//! Differential drive data model flowing through the pipeline.
//!
//! Every channel is an `Option`: `None` means "not computed yet", and a stage
//! that does not own a channel passes it through untouched. Records are built
//! fresh by the source on every tick; persistent state lives in stages.

use std::fmt;

/// One side of the drivetrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Commanded value for a single side.
///
/// The meaning of `value` (velocity, power, position) is fixed per pipeline by
/// convention. Once a stage makes it present, later stages must not clear it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveData {
    pub value: Option<f64>,
    /// Acceleration estimate consumed by feed-forward; `None` contributes zero.
    pub acceleration: Option<f64>,
}

impl DriveData {
    pub const EMPTY: DriveData = DriveData {
        value: None,
        acceleration: None,
    };

    pub fn new(value: f64) -> Self {
        Self {
            value: Some(value),
            acceleration: None,
        }
    }

    pub fn with_acceleration(mut self, acceleration: f64) -> Self {
        self.acceleration = Some(acceleration);
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }

    /// Adds `delta` to the value, treating an absent value as zero.
    pub fn offset(self, delta: f64) -> Self {
        Self {
            value: Some(self.value.unwrap_or(0.0) + delta),
            ..self
        }
    }

    /// Applies `f` to a present value and leaves an absent one absent.
    pub fn map_value(self, f: impl FnOnce(f64) -> f64) -> Self {
        Self {
            value: self.value.map(f),
            ..self
        }
    }
}

impl From<f64> for DriveData {
    fn from(value: f64) -> Self {
        DriveData::new(value)
    }
}

/// Aggregate record for both sides plus the two advisory global setpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TankDriveData {
    pub left: DriveData,
    pub right: DriveData,
    /// Absolute heading target in radians.
    pub heading_setpoint: Option<f64>,
    /// Turn rate target in radians per second.
    pub turn_rate_setpoint: Option<f64>,
}

impl TankDriveData {
    pub fn new(left: DriveData, right: DriveData) -> Self {
        Self {
            left,
            right,
            heading_setpoint: None,
            turn_rate_setpoint: None,
        }
    }

    pub fn from_values(left: f64, right: f64) -> Self {
        Self::new(DriveData::new(left), DriveData::new(right))
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading_setpoint = Some(heading);
        self
    }

    pub fn with_turn_rate(mut self, turn_rate: f64) -> Self {
        self.turn_rate_setpoint = Some(turn_rate);
        self
    }

    pub fn side(&self, side: Side) -> &DriveData {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Applies `f` to both sides; setpoints pass through.
    pub fn map_sides(self, mut f: impl FnMut(DriveData) -> DriveData) -> Self {
        Self {
            left: f(self.left),
            right: f(self.right),
            ..self
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.left.is_resolved() && self.right.is_resolved()
    }
}
