use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::error::GhostError;

/// Live heart-rate pushes outside this open interval are discarded.
pub const LIVE_HR_MIN_BPM: f64 = 30.0;
pub const LIVE_HR_MAX_BPM: f64 = 220.0;

/// One physiological sample. Field names follow the client wire format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub heart_rate: f64,
    /// 0-100 readiness score.
    pub recovery: f64,
    /// Cycle strain, roughly 0-21.
    pub strain: f64,
    /// Fraction 0-1.
    pub sleep_performance: f64,
    /// Milliseconds.
    pub hrv: f64,
    pub spo2: f64,
    pub skin_temp: f64,
}

impl Reading {
    pub fn validate(&self) -> Result<(), GhostError> {
        let fields = [
            ("heartRate", self.heart_rate),
            ("recovery", self.recovery),
            ("strain", self.strain),
            ("sleepPerformance", self.sleep_performance),
            ("hrv", self.hrv),
            ("spo2", self.spo2),
            ("skinTemp", self.skin_temp),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(GhostError::InvalidReading(format!("{name} is not a finite number")));
        }
        if !(0.0..=100.0).contains(&self.recovery) {
            return Err(GhostError::InvalidReading(format!(
                "recovery {} outside 0-100",
                self.recovery
            )));
        }
        if !(0.0..=1.0).contains(&self.sleep_performance) {
            return Err(GhostError::InvalidReading(format!(
                "sleepPerformance {} outside 0-1",
                self.sleep_performance
            )));
        }
        if self.hrv < 0.0 || self.strain < 0.0 || self.heart_rate < 0.0 {
            return Err(GhostError::InvalidReading(
                "hrv, strain and heartRate must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// A heart-rate value pushed by a BLE client, with its arrival time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveHeartRate {
    pub bpm: f64,
    pub received_at: Instant,
}

impl LiveHeartRate {
    /// Returns `None` for pushes outside the accepted physiological range.
    pub fn accept(bpm: f64, received_at: Instant) -> Option<Self> {
        (bpm > LIVE_HR_MIN_BPM && bpm < LIVE_HR_MAX_BPM).then_some(Self { bpm, received_at })
    }

    pub fn is_fresh(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.received_at) < window
    }
}
