//! Maps a reading, the HRV baseline and an optional live heart rate to one of
//! the five affective states plus a 0.0-3.0 stress score.
//!
//! Thresholds are heuristic and kept exactly as tuned; behaviour parity with
//! the client depends on them.

use std::time::{Duration, Instant};

use crate::error::GhostError;
use crate::models::{
    AffectiveState, Classification, LiveHeartRate, Reading, StateChange, StateChangeReason,
};

use super::baseline::BaselineTracker;

/// A live heart-rate push overrides the daily scores for this long.
pub const LIVE_HR_FRESHNESS: Duration = Duration::from_secs(5);

/// Stress score implied by current HRV relative to the personal baseline.
pub fn stress_from_hrv(hrv: f64, baseline: f64) -> f64 {
    let ratio = if baseline > 0.0 { hrv / baseline } else { 1.0 };
    if ratio < 0.60 {
        2.5
    } else if ratio < 0.75 {
        1.8
    } else if ratio < 0.85 {
        1.2
    } else {
        0.5
    }
}

fn classify_live(bpm: f64) -> Option<Classification> {
    let (state, stress) = if bpm > 110.0 {
        (AffectiveState::Stressed, 2.5)
    } else if bpm > 95.0 {
        (AffectiveState::Wired, 1.9)
    } else if bpm > 75.0 {
        (AffectiveState::DeepFocus, 1.2)
    } else if bpm >= 60.0 {
        (AffectiveState::Relaxed, 0.5)
    } else {
        return None;
    };
    Some(Classification { state, stress })
}

fn classify_daily(reading: &Reading, stress: f64) -> AffectiveState {
    let Reading {
        recovery,
        strain,
        sleep_performance,
        ..
    } = *reading;

    if recovery < 40.0 || sleep_performance < 0.7 {
        AffectiveState::Fatigued
    } else if stress >= 2.0 || strain > 16.0 {
        AffectiveState::Stressed
    } else if strain > 12.0 && recovery < 60.0 {
        AffectiveState::Wired
    } else if stress > 0.9
        && stress <= 1.5
        && (8.0..=14.0).contains(&strain)
        && recovery > 60.0
    {
        AffectiveState::DeepFocus
    } else {
        // Explicit RELAXED rule (stress <= 0.9, strain < 6, recovery > 80)
        // and the default both land here.
        AffectiveState::Relaxed
    }
}

/// Pure classification. The only time dependence is the live-override freshness check.
pub fn classify(
    reading: &Reading,
    baseline: f64,
    live: Option<&LiveHeartRate>,
    now: Instant,
) -> Result<Classification, GhostError> {
    reading.validate()?;

    let stress = stress_from_hrv(reading.hrv, baseline);

    let live_override = live
        .filter(|hr| hr.is_fresh(now, LIVE_HR_FRESHNESS))
        .filter(|hr| hr.bpm > 30.0 && hr.bpm < 220.0)
        .and_then(|hr| classify_live(hr.bpm));
    if let Some(classification) = live_override {
        return Ok(classification);
    }

    Ok(Classification {
        state: classify_daily(reading, stress),
        stress,
    })
}

/// Result of a stateful classification step.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyOutcome {
    pub classification: Classification,
    pub change: Option<StateChange>,
}

/// Owns the baseline window and the current state; emits a `StateChange`
/// value on transitions.
#[derive(Debug, Clone)]
pub struct BiometricClassifier {
    baseline: BaselineTracker,
    current: Classification,
}

impl Default for BiometricClassifier {
    fn default() -> Self {
        Self {
            baseline: BaselineTracker::default(),
            current: Classification {
                state: AffectiveState::Relaxed,
                stress: 0.0,
            },
        }
    }
}

impl BiometricClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_hrv(&mut self, hrv: f64) {
        if hrv > 0.0 && hrv.is_finite() {
            self.baseline.observe(hrv);
        }
    }

    pub fn baseline(&self) -> f64 {
        self.baseline.baseline()
    }

    pub fn current(&self) -> Classification {
        self.current
    }

    /// Classify without committing the result.
    pub fn peek(
        &self,
        reading: &Reading,
        live: Option<&LiveHeartRate>,
        now: Instant,
    ) -> Result<Classification, GhostError> {
        classify(reading, self.baseline(), live, now)
    }

    /// Classify and commit. A rejected reading leaves the previous state in place.
    pub fn update(
        &mut self,
        reading: &Reading,
        live: Option<&LiveHeartRate>,
        now: Instant,
    ) -> Result<ClassifyOutcome, GhostError> {
        let classification = self.peek(reading, live, now)?;
        let previous = self.current;
        self.current = classification;

        let change = (previous.state != classification.state).then(|| StateChange {
            from: previous.state,
            to: classification.state,
            reason: StateChangeReason::from_reading(reading),
            estimated_stress: classification.stress,
        });

        Ok(ClassifyOutcome {
            classification,
            change,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fatigued_reading() -> Reading {
        Reading {
            heart_rate: 55.0,
            recovery: 30.0,
            strain: 3.0,
            sleep_performance: 0.45,
            hrv: 28.0,
            spo2: 95.5,
            skin_temp: 33.0,
        }
    }

    fn relaxed_reading() -> Reading {
        Reading {
            heart_rate: 68.0,
            recovery: 85.0,
            strain: 4.5,
            sleep_performance: 0.92,
            hrv: 72.0,
            spo2: 98.0,
            skin_temp: 33.5,
        }
    }

    #[test]
    fn hrv_ratio_thresholds() {
        assert_eq!(stress_from_hrv(59.0, 100.0), 2.5);
        assert_eq!(stress_from_hrv(60.0, 100.0), 1.8);
        assert_eq!(stress_from_hrv(74.9, 100.0), 1.8);
        assert_eq!(stress_from_hrv(75.0, 100.0), 1.2);
        assert_eq!(stress_from_hrv(85.0, 100.0), 0.5);
        assert_eq!(stress_from_hrv(10.0, 0.0), 0.5);
    }

    #[test]
    fn low_recovery_and_sleep_is_fatigued() {
        let now = Instant::now();
        let result = classify(&fatigued_reading(), 65.0, None, now).unwrap();
        assert_eq!(result.state, AffectiveState::Fatigued);
        // 28 / 65 = 0.43, below the 0.60 ratio threshold.
        assert_eq!(result.stress, 2.5);
    }

    #[test]
    fn rested_reading_is_relaxed() {
        let now = Instant::now();
        let result = classify(&relaxed_reading(), 65.0, None, now).unwrap();
        assert_eq!(result.state, AffectiveState::Relaxed);
        assert_eq!(result.stress, 0.5);
    }

    #[test]
    fn fresh_live_hr_overrides_daily_scores() {
        let now = Instant::now();
        let live = LiveHeartRate::accept(120.0, now).unwrap();
        let result = classify(&relaxed_reading(), 65.0, Some(&live), now).unwrap();
        assert_eq!(result.state, AffectiveState::Stressed);
        assert_eq!(result.stress, 2.5);

        let result = classify(&fatigued_reading(), 65.0, Some(&live), now).unwrap();
        assert_eq!(result.state, AffectiveState::Stressed);
    }

    #[test]
    fn live_hr_bands() {
        let now = Instant::now();
        let cases = [
            (100.0, AffectiveState::Wired, 1.9),
            (80.0, AffectiveState::DeepFocus, 1.2),
            (60.0, AffectiveState::Relaxed, 0.5),
        ];
        for (bpm, state, stress) in cases {
            let live = LiveHeartRate::accept(bpm, now).unwrap();
            let result = classify(&fatigued_reading(), 65.0, Some(&live), now).unwrap();
            assert_eq!(result.state, state, "bpm {bpm}");
            assert_eq!(result.stress, stress, "bpm {bpm}");
        }
    }

    #[test]
    fn low_or_stale_live_hr_falls_through() {
        let t0 = Instant::now();
        let low = LiveHeartRate::accept(52.0, t0).unwrap();
        let result = classify(&relaxed_reading(), 65.0, Some(&low), t0).unwrap();
        assert_eq!(result.state, AffectiveState::Relaxed);

        let stale = LiveHeartRate::accept(130.0, t0).unwrap();
        let later = t0 + Duration::from_secs(6);
        let result = classify(&fatigued_reading(), 65.0, Some(&stale), later).unwrap();
        assert_eq!(result.state, AffectiveState::Fatigued);
    }

    #[test]
    fn daily_rule_order() {
        let now = Instant::now();
        let stressed = Reading {
            strain: 18.5,
            recovery: 45.0,
            sleep_performance: 0.72,
            hrv: 22.0,
            ..relaxed_reading()
        };
        assert_eq!(classify(&stressed, 50.0, None, now).unwrap().state, AffectiveState::Stressed);

        let wired = Reading {
            strain: 14.3,
            recovery: 50.0,
            sleep_performance: 0.70,
            hrv: 45.0,
            ..relaxed_reading()
        };
        assert_eq!(classify(&wired, 50.0, None, now).unwrap().state, AffectiveState::Wired);

        let focus = Reading {
            strain: 10.2,
            recovery: 75.0,
            sleep_performance: 0.85,
            hrv: 40.0,
            ..relaxed_reading()
        };
        let result = classify(&focus, 50.0, None, now).unwrap();
        assert_eq!(result.state, AffectiveState::DeepFocus);
        assert_eq!(result.stress, 1.2);
    }

    #[test]
    fn identical_inputs_give_identical_outputs() {
        let now = Instant::now();
        let a = classify(&fatigued_reading(), 61.0, None, now).unwrap();
        let b = classify(&fatigued_reading(), 61.0, None, now).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn malformed_reading_keeps_previous_state() {
        let now = Instant::now();
        let mut classifier = BiometricClassifier::new();
        classifier.update(&fatigued_reading(), None, now).unwrap();
        let bad = Reading {
            hrv: f64::INFINITY,
            ..relaxed_reading()
        };
        assert!(matches!(
            classifier.update(&bad, None, now),
            Err(GhostError::InvalidReading(_))
        ));
        assert_eq!(classifier.current().state, AffectiveState::Fatigued);
    }

    #[test]
    fn transitions_produce_state_change_events() {
        let now = Instant::now();
        let mut classifier = BiometricClassifier::new();
        let outcome = classifier.update(&relaxed_reading(), None, now).unwrap();
        assert!(outcome.change.is_none());

        let outcome = classifier.update(&fatigued_reading(), None, now).unwrap();
        let change = outcome.change.expect("transition");
        assert_eq!(change.from, AffectiveState::Relaxed);
        assert_eq!(change.to, AffectiveState::Fatigued);
        assert_eq!(change.reason, StateChangeReason::LowRecovery);
    }

    #[test]
    fn baseline_ignores_non_positive_hrv() {
        let mut classifier = BiometricClassifier::new();
        classifier.observe_hrv(0.0);
        classifier.observe_hrv(f64::NAN);
        assert_eq!(classifier.baseline(), 50.0);
        classifier.observe_hrv(65.0);
        assert_eq!(classifier.baseline(), 65.0);
    }
}
