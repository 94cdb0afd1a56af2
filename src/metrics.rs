//! Metrics module - tick timing and executor counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hdrhistogram::Histogram;
use parking_lot::Mutex;

// ============================================================================
// EXECUTOR STATS - lock-free counters updated by the pipeline thread
// ============================================================================

#[derive(Debug, Default)]
pub struct ExecutorStats {
    pub total_ticks: AtomicU64,
    pub overruns: AtomicU64,
    pub skipped_boundaries: AtomicU64,
    pub tick_errors: AtomicU64,
    pub panics: AtomicU64,
    pub fail_safes: AtomicU64,
    pub assemblies: AtomicU64,
}

impl ExecutorStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_ticks: self.total_ticks.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            skipped_boundaries: self.skipped_boundaries.load(Ordering::Relaxed),
            tick_errors: self.tick_errors.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
            fail_safes: self.fail_safes.load(Ordering::Relaxed),
            assemblies: self.assemblies.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_ticks: u64,
    pub overruns: u64,
    /// Tick boundaries dropped because an overrun ran past them.
    pub skipped_boundaries: u64,
    pub tick_errors: u64,
    pub panics: u64,
    pub fail_safes: u64,
    /// Pipelines started over the executor's lifetime.
    pub assemblies: u64,
}

impl StatsSnapshot {
    /// Percentage of ticks that finished within their period.
    pub fn compliance(&self) -> f64 {
        if self.total_ticks > 0 {
            (self.total_ticks.saturating_sub(self.overruns)) as f64 / self.total_ticks as f64 * 100.0
        } else {
            100.0
        }
    }
}

// ============================================================================
// TICK METRICS - duration and jitter histograms
// ============================================================================

#[derive(Clone)]
pub struct TickMetrics {
    tick_hist: Arc<Mutex<Histogram<u64>>>,
    jitter_hist: Arc<Mutex<Histogram<u64>>>,
}

fn histogram() -> Histogram<u64> {
    // Three significant figures is always a valid precision
    Histogram::new(3).expect("valid histogram precision")
}

impl TickMetrics {
    pub fn new() -> Self {
        Self {
            tick_hist: Arc::new(Mutex::new(histogram())),
            jitter_hist: Arc::new(Mutex::new(histogram())),
        }
    }

    pub fn record_tick(&self, duration: Duration) {
        self.tick_hist.lock().record(duration.as_nanos() as u64).ok();
    }

    /// Records how far the spacing between two tick starts strayed from the period.
    pub fn record_interval(&self, interval: Duration, period: Duration) {
        let jitter = if interval > period {
            interval - period
        } else {
            period - interval
        };
        self.jitter_hist.lock().record(jitter.as_nanos() as u64).ok();
    }

    pub fn reset(&self) {
        self.tick_hist.lock().reset();
        self.jitter_hist.lock().reset();
    }

    pub fn report(&self) -> MetricsReport {
        let tick = self.tick_hist.lock();
        let jitter = self.jitter_hist.lock();

        MetricsReport {
            samples: tick.len(),
            tick_p50: Duration::from_nanos(tick.value_at_quantile(0.5)),
            tick_p99: Duration::from_nanos(tick.value_at_quantile(0.99)),
            tick_max: Duration::from_nanos(tick.max()),
            jitter_p50: Duration::from_nanos(jitter.value_at_quantile(0.5)),
            jitter_p99: Duration::from_nanos(jitter.value_at_quantile(0.99)),
        }
    }
}

impl Default for TickMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsReport {
    pub samples: u64,
    pub tick_p50: Duration,
    pub tick_p99: Duration,
    pub tick_max: Duration,
    pub jitter_p50: Duration,
    pub jitter_p99: Duration,
}
