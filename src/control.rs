//! Closed-loop control stages.
//!
//! Both controllers consume one of the advisory setpoints on
//! [`TankDriveData`](crate::data::TankDriveData) and write a symmetric
//! left/right correction, leaving the other setpoint for a downstream stage.

pub mod heading;
pub mod pid;
pub mod turn_rate;

pub use heading::{normalize_angle, HeadingPidStage};
pub use pid::{apply_turn_correction, PidController, PidGains, PidTelemetry};
pub use turn_rate::TurnRatePidStage;
