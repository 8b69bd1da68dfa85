//! Rolling personal HRV baseline.
//!
//! A short window smooths out single-night spikes while still following slow
//! drift in the wearer's physiology.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of HRV samples kept in the window.
pub const BASELINE_WINDOW: usize = 14;

/// Baseline reported before any sample has been observed.
pub const DEFAULT_HRV_BASELINE: f64 = 50.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineTracker {
    samples: VecDeque<f64>,
    window_size: usize,
    baseline: f64,
}

impl Default for BaselineTracker {
    fn default() -> Self {
        Self::new(BASELINE_WINDOW)
    }
}

impl BaselineTracker {
    pub fn new(window_size: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(window_size),
            window_size: window_size.max(1),
            baseline: DEFAULT_HRV_BASELINE,
        }
    }

    /// Append a sample, evicting the oldest once the window is full.
    pub fn observe(&mut self, hrv: f64) {
        self.samples.push_back(hrv);
        while self.samples.len() > self.window_size {
            self.samples.pop_front();
        }
        self.baseline = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
