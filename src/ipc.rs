//! State shared between the host thread and the pipeline thread.
//!
//! - [`ConfigBuffer`]: read-mostly config snapshot, read at rebuild time.
//! - [`LiveValue`]: lock-free values (setpoints, axes) read every tick.
//! - [`DiagnosticLog`]: bounded log of tick reports going back to the host.

pub mod shared_resource;

pub use shared_resource::{ConfigBuffer, DiagnosticLog, LiveValue};
