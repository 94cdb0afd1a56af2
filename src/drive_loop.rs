//! A drive pipeline bound to its configuration source.
//!
//! The host edits the shared [`ConfigBuffer`] whenever it likes; nothing
//! reaches the running pipeline until [`DriveLoop::reset`] rebuilds it from a
//! fresh snapshot.

use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{BuildError, ExecutorError, TickError};
use crate::executor::{ExecutorState, PeriodicExecutor};
use crate::ipc::ConfigBuffer;
use crate::pipeline::Task;

pub type BoxedTask = Box<dyn Task + Send>;

pub struct DriveLoop<F> {
    config: ConfigBuffer,
    factory: F,
    executor: PeriodicExecutor,
}

impl<F> DriveLoop<F>
where
    F: Fn(&PipelineConfig) -> Result<BoxedTask, BuildError>,
{
    pub fn new(name: impl Into<String>, config: ConfigBuffer, factory: F) -> Self {
        Self {
            config,
            factory,
            executor: PeriodicExecutor::new(name),
        }
    }

    /// Builds from the current snapshot and starts ticking.
    pub fn start(&self) -> Result<(), ExecutorError> {
        if self.executor.state() == ExecutorState::Running {
            return Err(ExecutorError::AlreadyRunning(self.executor.name().to_string()));
        }
        self.reset()
    }

    /// Rebuilds the pipeline from the config snapshot taken now and swaps it
    /// in for the running one. A build error leaves the loop stopped.
    pub fn reset(&self) -> Result<(), ExecutorError> {
        self.executor.reset(|| {
            let snapshot = self.config.get();
            snapshot.validate()?;
            self.executor.set_fail_safe(snapshot.fail_safe_enabled);
            let task = (self.factory)(&snapshot)?;
            info!(
                executor = %self.executor.name(),
                period_ms = snapshot.period_ms,
                "assembled pipeline from config snapshot"
            );
            Ok((task, snapshot.period()))
        })
    }

    pub fn stop(&self) -> Result<(), ExecutorError> {
        self.executor.stop()
    }

    pub fn state(&self) -> ExecutorState {
        self.executor.state()
    }

    pub fn take_fatal_error(&self) -> Option<TickError> {
        self.executor.take_fatal_error()
    }

    pub fn config(&self) -> &ConfigBuffer {
        &self.config
    }

    pub fn executor(&self) -> &PeriodicExecutor {
        &self.executor
    }
}
