pub mod actuator;
pub mod assembly;
pub mod config;
pub mod control;
pub mod data;
pub mod drive_loop;
pub mod error;
pub mod executor;
pub mod ipc;
pub mod metrics;
pub mod pipeline;
pub mod sensor;
pub mod shaping;
pub mod sim;

pub use data::{DriveData, Side, TankDriveData};
pub use drive_loop::DriveLoop;
pub use error::{ActuatorError, BuildError, ConfigError, ExecutorError, SensorError, TickError};
pub use executor::{ExecutorState, PeriodicExecutor};
