//! Periodic executor running one assembled pipeline on a dedicated thread.
//!
//! State machine: `Idle -> Running -> Idle`. [`PeriodicExecutor::reset`]
//! swaps the running assembly for a freshly built one without passing through
//! an observable idle period, and never lets two assemblies tick at once.
//!
//! Tick failures are contained at the tick boundary: they are counted, logged
//! and written to the [`DiagnosticLog`]; the schedule keeps going. Only fatal
//! (configuration) errors stop the loop. Panics are caught and treated as tick
//! errors, so nothing unwinds across the thread boundary.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{BuildError, ExecutorError, TickError};
use crate::ipc::DiagnosticLog;
use crate::metrics::{ExecutorStats, StatsSnapshot, TickMetrics};
use crate::pipeline::Task;

const DIAGNOSTIC_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    Running,
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorState::Idle => write!(f, "Idle"),
            ExecutorState::Running => write!(f, "Running"),
        }
    }
}

type BoxedTask = Box<dyn Task + Send>;

struct Worker {
    // Dropping the sender wakes the worker and ends the loop
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
    finished: Arc<AtomicBool>,
    period: Duration,
}

/// State the worker thread reports into.
struct Shared {
    name: String,
    stats: Arc<ExecutorStats>,
    metrics: TickMetrics,
    diagnostics: DiagnosticLog,
    fatal: Mutex<Option<TickError>>,
    fail_safe: AtomicBool,
}

pub struct PeriodicExecutor {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl PeriodicExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                stats: ExecutorStats::new(),
                metrics: TickMetrics::new(),
                diagnostics: DiagnosticLog::new(DIAGNOSTIC_CAPACITY),
                fatal: Mutex::new(None),
                fail_safe: AtomicBool::new(true),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Whether a failed tick is followed by the task's fail-safe hook.
    pub fn set_fail_safe(&self, enabled: bool) {
        self.shared.fail_safe.store(enabled, Ordering::Relaxed);
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn state(&self) -> ExecutorState {
        match &*self.worker.lock() {
            Some(worker) if !worker.finished.load(Ordering::Acquire) => ExecutorState::Running,
            _ => ExecutorState::Idle,
        }
    }

    pub fn period(&self) -> Option<Duration> {
        self.worker.lock().as_ref().map(|w| w.period)
    }

    /// Starts ticking `task` every `period`.
    pub fn start<T>(&self, task: T, period: Duration) -> Result<(), ExecutorError>
    where
        T: Task + Send + 'static,
    {
        let mut worker = self.worker.lock();
        if let Some(current) = worker.as_ref() {
            if !current.finished.load(Ordering::Acquire) {
                return Err(ExecutorError::AlreadyRunning(self.shared.name.clone()));
            }
        }
        // Reap a worker that stopped itself on a fatal error
        self.halt(&mut worker)?;
        *worker = Some(self.spawn(Box::new(task), period)?);
        Ok(())
    }

    /// Cancels future ticks and waits for the in-flight one to finish.
    ///
    /// No tick starts after this returns. Stopping an idle executor is a no-op.
    pub fn stop(&self) -> Result<(), ExecutorError> {
        let mut worker = self.worker.lock();
        self.halt(&mut worker)
    }

    /// Builds a new assembly, stops the current one, and starts the new one.
    ///
    /// `build` runs before the worker lock is taken, so it may query this
    /// executor. On a build error the current assembly is still stopped, the
    /// executor stays idle and the error is returned.
    pub fn reset<T, F>(&self, build: F) -> Result<(), ExecutorError>
    where
        T: Task + Send + 'static,
        F: FnOnce() -> Result<(T, Duration), BuildError>,
    {
        let built = build();
        let mut worker = self.worker.lock();
        self.halt(&mut worker)?;

        let (task, period) = built.map_err(|e| {
            error!(executor = %self.shared.name, error = %e, "rebuild failed, staying idle");
            e
        })?;
        *worker = Some(self.spawn(Box::new(task), period)?);
        info!(executor = %self.shared.name, "pipeline rebuilt");
        Ok(())
    }

    /// Takes the error that stopped the schedule, if any.
    pub fn take_fatal_error(&self) -> Option<TickError> {
        self.shared.fatal.lock().take()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn metrics(&self) -> TickMetrics {
        self.shared.metrics.clone()
    }

    pub fn diagnostics(&self) -> DiagnosticLog {
        self.shared.diagnostics.clone()
    }

    fn spawn(&self, task: BoxedTask, period: Duration) -> Result<Worker, ExecutorError> {
        if period.is_zero() {
            return Err(BuildError::ZeroPeriod.into());
        }
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let finished = Arc::new(AtomicBool::new(false));

        let shared = self.shared.clone();
        let done = finished.clone();
        let handle = thread::Builder::new()
            .name(format!("pipeline-{}", self.shared.name))
            .spawn(move || {
                run_loop(&shared, task, period, &stop_rx);
                done.store(true, Ordering::Release);
            })
            .map_err(|e| ExecutorError::Spawn(e.to_string()))?;

        self.shared.stats.assemblies.fetch_add(1, Ordering::Relaxed);
        info!(
            executor = %self.shared.name,
            period_ms = period.as_secs_f64() * 1000.0,
            "pipeline started"
        );
        Ok(Worker {
            stop_tx,
            handle,
            finished,
            period,
        })
    }

    fn halt(&self, worker: &mut Option<Worker>) -> Result<(), ExecutorError> {
        let Some(current) = worker.take() else {
            return Ok(());
        };
        if current.handle.thread().id() == thread::current().id() {
            // Joining ourselves would never return
            *worker = Some(current);
            return Err(ExecutorError::FromPipelineThread(self.shared.name.clone()));
        }

        drop(current.stop_tx);
        if current.handle.join().is_err() {
            // Ticks are unwind-contained, so only the loop itself could get here
            error!(executor = %self.shared.name, "executor thread panicked");
        }
        info!(executor = %self.shared.name, "pipeline stopped");
        Ok(())
    }
}

impl Drop for PeriodicExecutor {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(executor = %self.shared.name, error = %e, "failed to stop on drop");
        }
    }
}

fn run_loop(shared: &Shared, mut task: BoxedTask, period: Duration, stop_rx: &Receiver<()>) {
    let mut next = Instant::now();
    let mut last_start: Option<Instant> = None;

    loop {
        if wait_for_boundary(next, stop_rx) {
            break;
        }

        let start = Instant::now();
        if let Some(prev) = last_start {
            shared.metrics.record_interval(start - prev, period);
        }
        last_start = Some(start);

        let outcome = catch_unwind(AssertUnwindSafe(|| task.tick()));
        shared.metrics.record_tick(start.elapsed());
        shared.stats.total_ticks.fetch_add(1, Ordering::Relaxed);

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(payload) => {
                shared.stats.panics.fetch_add(1, Ordering::Relaxed);
                Some(TickError::Panic(panic_message(payload.as_ref())))
            }
        };

        if let Some(e) = failure {
            shared.stats.tick_errors.fetch_add(1, Ordering::Relaxed);
            shared.diagnostics.write(format!("[{}] {}", shared.name, e));
            let fatal = e.is_fatal();
            if fatal {
                error!(executor = %shared.name, error = %e, "fatal tick error, stopping schedule");
            } else {
                warn!(executor = %shared.name, error = %e, "tick failed");
            }
            if shared.fail_safe.load(Ordering::Relaxed) {
                fail_safe(shared, &mut task);
            }
            if fatal {
                *shared.fatal.lock() = Some(e);
                break;
            }
        }

        next += period;
        let now = Instant::now();
        if now >= next {
            let (boundary, missed) = skip_missed(next, now, period);
            next = boundary;
            shared.stats.overruns.fetch_add(1, Ordering::Relaxed);
            shared
                .stats
                .skipped_boundaries
                .fetch_add(missed, Ordering::Relaxed);
            warn!(
                executor = %shared.name,
                tick_ms = start.elapsed().as_secs_f64() * 1000.0,
                missed,
                "tick overran its period"
            );
        }
    }
    debug!(executor = %shared.name, "tick loop exited");
}

/// Skips every boundary at or before `now` instead of queueing them.
///
/// Returns the first boundary after `now` and how many were skipped.
fn skip_missed(next: Instant, now: Instant, period: Duration) -> (Instant, u64) {
    let period_ns = period.as_nanos();
    let behind_ns = now.saturating_duration_since(next).as_nanos();
    let missed = u64::try_from(behind_ns / period_ns)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    // Remainder is below period_ns, so it only overflows for absurd periods
    let into_period = u64::try_from(behind_ns % period_ns).unwrap_or(0);
    (now + period - Duration::from_nanos(into_period), missed)
}

/// Sleeps until `deadline`; returns true when a stop was requested.
fn wait_for_boundary(deadline: Instant, stop_rx: &Receiver<()>) -> bool {
    let now = Instant::now();
    if deadline > now {
        !matches!(
            stop_rx.recv_timeout(deadline - now),
            Err(RecvTimeoutError::Timeout)
        )
    } else {
        !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty))
    }
}

fn fail_safe(shared: &Shared, task: &mut BoxedTask) {
    shared.stats.fail_safes.fetch_add(1, Ordering::Relaxed);
    match catch_unwind(AssertUnwindSafe(|| task.fail_safe())) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(executor = %shared.name, error = %e, "fail-safe output failed");
            shared
                .diagnostics
                .write(format!("[{}] fail-safe: {}", shared.name, e));
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(executor = %shared.name, panic = %message, "fail-safe panicked");
            shared
                .diagnostics
                .write(format!("[{}] fail-safe panicked: {}", shared.name, message));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
