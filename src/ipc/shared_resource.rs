use std::collections::VecDeque;
use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use parking_lot::{Mutex, RwLock};

use crate::config::PipelineConfig;

// Bounded report channel from the pipeline thread to the host
#[derive(Clone)]
pub struct DiagnosticLog {
    entries: Arc<RwLock<VecDeque<String>>>,
    max_size: usize,
}

impl DiagnosticLog {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(max_size))),
            max_size,
        }
    }

    pub fn write(&self, message: String) {
        let mut log = self.entries.write();
        log.push_back(message);
        if log.len() > self.max_size {
            log.pop_front();
        }
    }

    pub fn read_all(&self) -> Vec<String> {
        self.entries.read().iter().cloned().collect()
    }

    pub fn last(&self) -> Option<String> {
        self.entries.read().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

// Shared configuration snapshot, replaced whole so readers never see a
// half-updated gain set
#[derive(Clone)]
pub struct ConfigBuffer {
    data: Arc<Mutex<PipelineConfig>>,
}

impl ConfigBuffer {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            data: Arc::new(Mutex::new(config)),
        }
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut PipelineConfig),
    {
        let mut config = self.data.lock();
        f(&mut config);
    }

    pub fn replace(&self, config: PipelineConfig) {
        *self.data.lock() = config;
    }

    pub fn get(&self) -> PipelineConfig {
        self.data.lock().clone()
    }
}

impl Default for ConfigBuffer {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

/// Lock-free `f64` written by the host and read by the pipeline every tick.
#[derive(Debug, Clone, Default)]
pub struct LiveValue {
    cell: Arc<AtomicCell<f64>>,
}

impl LiveValue {
    pub fn new(value: f64) -> Self {
        Self {
            cell: Arc::new(AtomicCell::new(value)),
        }
    }

    pub fn get(&self) -> f64 {
        self.cell.load()
    }

    pub fn set(&self, value: f64) {
        self.cell.store(value);
    }
}
