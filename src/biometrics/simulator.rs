use rand::Rng;
use std::time::{Duration, Instant};

use crate::error::GhostError;
use crate::models::{AffectiveState, Reading};

/// Preset switches ease in over this long.
pub const TRANSITION: Duration = Duration::from_secs(2);

pub const DEFAULT_PRESET: u8 = 4;

/// The five canned physiological profiles, numbered 1-5 as on the client's hotbar.
const PRESETS: [Reading; 5] = [
    Reading {
        heart_rate: 62.0,
        strain: 10.2,
        recovery: 75.0,
        sleep_performance: 0.85,
        hrv: 40.0,
        spo2: 97.5,
        skin_temp: 33.2,
    },
    Reading {
        heart_rate: 95.0,
        strain: 18.5,
        recovery: 45.0,
        sleep_performance: 0.72,
        hrv: 22.0,
        spo2: 96.0,
        skin_temp: 34.1,
    },
    Reading {
        heart_rate: 55.0,
        strain: 3.1,
        recovery: 30.0,
        sleep_performance: 0.45,
        hrv: 28.0,
        spo2: 95.5,
        skin_temp: 33.0,
    },
    Reading {
        heart_rate: 68.0,
        strain: 4.5,
        recovery: 85.0,
        sleep_performance: 0.92,
        hrv: 72.0,
        spo2: 98.0,
        skin_temp: 33.5,
    },
    Reading {
        heart_rate: 88.0,
        strain: 14.3,
        recovery: 50.0,
        sleep_performance: 0.70,
        hrv: 35.0,
        spo2: 96.5,
        skin_temp: 33.8,
    },
];

pub fn preset(number: u8) -> Result<Reading, GhostError> {
    match number {
        1..=5 => Ok(PRESETS[usize::from(number) - 1]),
        other => Err(GhostError::InvalidPreset(other)),
    }
}

pub fn preset_name(number: u8) -> Option<AffectiveState> {
    match number {
        1 => Some(AffectiveState::DeepFocus),
        2 => Some(AffectiveState::Stressed),
        3 => Some(AffectiveState::Fatigued),
        4 => Some(AffectiveState::Relaxed),
        5 => Some(AffectiveState::Wired),
        _ => None,
    }
}

fn lerp(from: f64, to: f64, progress: f64) -> f64 {
    from + (to - from) * progress
}

fn interpolate(from: &Reading, to: &Reading, progress: f64) -> Reading {
    Reading {
        heart_rate: lerp(from.heart_rate, to.heart_rate, progress),
        recovery: lerp(from.recovery, to.recovery, progress),
        strain: lerp(from.strain, to.strain, progress),
        sleep_performance: lerp(from.sleep_performance, to.sleep_performance, progress),
        hrv: lerp(from.hrv, to.hrv, progress),
        spo2: lerp(from.spo2, to.spo2, progress),
        skin_temp: lerp(from.skin_temp, to.skin_temp, progress),
    }
}

/// Deterministic fallback source. Interpolation is evaluated lazily from the
/// elapsed time, so there is no background task to manage.
#[derive(Debug, Clone)]
pub struct BiometricSimulator {
    preset: u8,
    from: Reading,
    target: Reading,
    started: Option<Instant>,
}

impl Default for BiometricSimulator {
    fn default() -> Self {
        let base = PRESETS[usize::from(DEFAULT_PRESET) - 1];
        Self {
            preset: DEFAULT_PRESET,
            from: base,
            target: base,
            started: None,
        }
    }
}

impl BiometricSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preset(&self) -> u8 {
        self.preset
    }

    /// Begin easing toward preset `number`, starting from wherever the
    /// current transition has got to.
    pub fn set_preset(&mut self, number: u8, now: Instant) -> Result<(), GhostError> {
        let target = preset(number)?;
        self.from = self.reading(now);
        self.target = target;
        self.preset = number;
        self.started = Some(now);
        Ok(())
    }

    pub fn reading(&self, now: Instant) -> Reading {
        let Some(start) = self.started else {
            return self.target;
        };
        let elapsed = now.saturating_duration_since(start);
        let progress = (elapsed.as_secs_f64() / TRANSITION.as_secs_f64()).min(1.0);
        interpolate(&self.from, &self.target, progress)
    }
}

fn heart_rate_range(state: AffectiveState) -> (f64, f64) {
    match state {
        AffectiveState::Relaxed => (62.0, 72.0),
        AffectiveState::DeepFocus => (65.0, 78.0),
        AffectiveState::Stressed => (85.0, 100.0),
        AffectiveState::Fatigued => (55.0, 65.0),
        AffectiveState::Wired => (80.0, 95.0),
    }
}

/// Random-walk heart rate for provider readings, which only carry resting HR.
#[derive(Debug, Clone)]
pub struct HeartRateSimulator {
    current: f64,
}

impl Default for HeartRateSimulator {
    fn default() -> Self {
        Self { current: 67.0 }
    }
}

impl HeartRateSimulator {
    pub fn next<R: Rng + ?Sized>(&mut self, state: AffectiveState, rng: &mut R) -> f64 {
        let (lo, hi) = heart_rate_range(state);
        let mid = (lo + hi) / 2.0;
        self.current += (mid - self.current) * 0.15 + rng.gen_range(-3.0..=3.0);
        self.current = self.current.clamp(lo, hi);
        self.current.round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn unknown_preset_is_rejected() {
        assert_eq!(preset(0), Err(GhostError::InvalidPreset(0)));
        assert_eq!(preset(6), Err(GhostError::InvalidPreset(6)));
        let mut sim = BiometricSimulator::new();
        assert!(sim.set_preset(9, Instant::now()).is_err());
        assert_eq!(sim.preset(), DEFAULT_PRESET);
    }

    #[test]
    fn starts_on_relaxed_preset() {
        let sim = BiometricSimulator::new();
        assert_eq!(sim.reading(Instant::now()), preset(4).unwrap());
    }

    #[test]
    fn transition_interpolates_then_settles() {
        let t0 = Instant::now();
        let mut sim = BiometricSimulator::new();
        sim.set_preset(2, t0).unwrap();

        let halfway = sim.reading(t0 + Duration::from_secs(1));
        assert!((halfway.hrv - (72.0 + 22.0) / 2.0).abs() < 1e-9);

        let settled = sim.reading(t0 + Duration::from_secs(3));
        assert_eq!(settled, preset(2).unwrap());
    }

    #[test]
    fn simulated_heart_rate_stays_in_state_band() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut hr = HeartRateSimulator::default();
        for _ in 0..50 {
            let bpm = hr.next(AffectiveState::Stressed, &mut rng);
            assert!((85.0..=100.0).contains(&bpm), "bpm {bpm}");
        }
        for _ in 0..50 {
            let bpm = hr.next(AffectiveState::Fatigued, &mut rng);
            assert!((55.0..=65.0).contains(&bpm), "bpm {bpm}");
        }
    }

    #[test]
    fn preset_names_match_client_hotbar() {
        assert_eq!(preset_name(1), Some(AffectiveState::DeepFocus));
        assert_eq!(preset_name(3), Some(AffectiveState::Fatigued));
        assert_eq!(preset_name(7), None);
    }
}
