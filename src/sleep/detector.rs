use serde::Serialize;
use std::time::{Duration, Instant};

use crate::models::LiveHeartRate;

const ENABLE_LOGS: bool = true;
use crate::log_info;

/// Live heart rate below this counts toward sleep.
pub const LOW_HR_BPM: f64 = 50.0;
/// Consecutive low cycles needed before entering sleep.
pub const LOW_HR_CYCLES: u32 = 5;
/// Live data older than this is treated as unknown, never as sleep.
pub const STALE_AFTER: Duration = Duration::from_secs(10);
/// Grace period between a BLE disconnect and entering sleep.
pub const DISCONNECT_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SleepState {
    #[default]
    Awake,
    Asleep,
}

impl SleepState {
    pub fn is_asleep(&self) -> bool {
        *self == SleepState::Asleep
    }
}

/// Hysteresis machine over BLE connectivity and live heart rate. Every method
/// returns the new state when it changed, so the caller can publish exactly
/// one `sleep_mode` event per transition.
#[derive(Debug, Default)]
pub struct SleepDetector {
    state: SleepState,
    low_hr_count: u32,
    disconnected: bool,
    check_pending: bool,
}

impl SleepDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SleepState {
        self.state
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Arms the deferred check. The caller schedules `on_disconnect_timeout`
    /// after `DISCONNECT_GRACE`; a second disconnect re-arms it.
    pub fn on_disconnect(&mut self) {
        self.disconnected = true;
        self.check_pending = true;
    }

    pub fn on_disconnect_timeout(&mut self) -> Option<SleepState> {
        if !std::mem::take(&mut self.check_pending) || !self.disconnected {
            return None;
        }
        if self.state.is_asleep() {
            return None;
        }
        log_info!("[sleep] BLE disconnected for {}s, entering sleep", DISCONNECT_GRACE.as_secs());
        self.enter(SleepState::Asleep)
    }

    pub fn on_reconnect(&mut self) -> Option<SleepState> {
        self.disconnected = false;
        self.check_pending = false;
        if !self.state.is_asleep() {
            return None;
        }
        log_info!("[sleep] BLE reconnected, waking");
        self.low_hr_count = 0;
        self.enter(SleepState::Awake)
    }

    /// Runs once per biometric cycle. Ignored while the disconnect path owns
    /// the decision.
    pub fn on_cycle(&mut self, live: Option<&LiveHeartRate>, now: Instant) -> Option<SleepState> {
        if self.disconnected {
            return None;
        }

        let Some(live) = live.filter(|hr| hr.is_fresh(now, STALE_AFTER)) else {
            self.low_hr_count = 0;
            if self.state.is_asleep() {
                log_info!("[sleep] no live heart rate, waking");
                return self.enter(SleepState::Awake);
            }
            return None;
        };

        if live.bpm < LOW_HR_BPM {
            self.low_hr_count += 1;
            if self.low_hr_count >= LOW_HR_CYCLES && !self.state.is_asleep() {
                log_info!("[sleep] low HR={} for {} cycles, entering sleep", live.bpm, self.low_hr_count);
                return self.enter(SleepState::Asleep);
            }
            None
        } else {
            self.low_hr_count = 0;
            if self.state.is_asleep() {
                log_info!("[sleep] HR={}, waking", live.bpm);
                return self.enter(SleepState::Awake);
            }
            None
        }
    }

    fn enter(&mut self, state: SleepState) -> Option<SleepState> {
        self.state = state;
        Some(state)
    }
}
