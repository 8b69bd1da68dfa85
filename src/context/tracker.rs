use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::time::{Duration, Instant};

use crate::models::{AffectiveState, AnalysisResult};

const MAX_HISTORY: usize = 100;
const MAX_STRESS_SAMPLES: usize = 500;
const SUMMARY_WINDOW: usize = 10;
const SWITCH_WINDOW: usize = 6;
const RAPID_SWITCH_APPS: usize = 4;
const HIGH_STRESS: f64 = 2.0;
/// Nominal spacing of stress samples, used to turn counts into minutes.
const SAMPLE_INTERVAL_SECS: f64 = 5.0;
const STUCK_REPORT_AFTER: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct ContextEntry {
    pub at: Instant,
    pub app: Option<String>,
    pub activity: Option<String>,
    pub stuck: bool,
    pub state: AffectiveState,
    pub stress: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct StressStats {
    pub avg: f64,
    pub peak: f64,
    pub current: f64,
    pub high_stress_minutes: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SessionStats {
    pub session_duration_minutes: f64,
    pub total_analyses: usize,
    pub times_stuck: usize,
    pub context_switches: u32,
    pub state_distribution: BTreeMap<String, usize>,
    pub current_app: Option<String>,
    pub current_activity: Option<String>,
    pub rapid_switching: bool,
    pub stress_stats: StressStats,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Bounded memory of what the user has been doing, fed one analysis at a time.
#[derive(Debug, Default)]
pub struct ContextTracker {
    history: VecDeque<ContextEntry>,
    stress_series: VecDeque<f64>,
    current_app: Option<String>,
    current_activity: Option<String>,
    context_switches: u32,
    stuck_since: Option<Instant>,
    stuck_duration: Duration,
}

impl ContextTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, analysis: &AnalysisResult, state: AffectiveState, stress: f64, now: Instant) {
        self.history.push_back(ContextEntry {
            at: now,
            app: analysis.app.clone(),
            activity: analysis.activity.clone(),
            stuck: analysis.is_stuck(),
            state,
            stress,
        });
        if self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }

        self.stress_series.push_back(stress);
        if self.stress_series.len() > MAX_STRESS_SAMPLES {
            self.stress_series.pop_front();
        }

        if self.current_app.is_some() && analysis.app != self.current_app {
            self.context_switches += 1;
        }
        self.current_app = analysis.app.clone();
        self.current_activity = analysis.activity.clone();

        if analysis.is_stuck() {
            let since = *self.stuck_since.get_or_insert(now);
            self.stuck_duration = now.saturating_duration_since(since);
        } else {
            self.stuck_since = None;
            self.stuck_duration = Duration::ZERO;
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn context_switches(&self) -> u32 {
        self.context_switches
    }

    pub fn stuck_duration(&self) -> Duration {
        self.stuck_duration
    }

    /// One-paragraph digest of the last ten entries, handed to the analysis
    /// service as context.
    pub fn summary(&self) -> Option<String> {
        if self.history.is_empty() {
            return None;
        }
        let recent = self.history.iter().rev().take(SUMMARY_WINDOW);
        let mut apps = BTreeSet::new();
        let mut activities = BTreeSet::new();
        for entry in recent {
            if let Some(app) = entry.app.as_deref().filter(|a| !a.is_empty()) {
                apps.insert(app);
            }
            if let Some(activity) = entry.activity.as_deref().filter(|a| !a.is_empty()) {
                activities.insert(activity);
            }
        }

        let mut summary = format!(
            "Apps: {}. Activities: {}. Context switches: {}.",
            apps.into_iter().collect::<Vec<_>>().join(", "),
            activities.into_iter().collect::<Vec<_>>().join(", "),
            self.context_switches,
        );
        if self.stuck_duration > STUCK_REPORT_AFTER {
            summary.push_str(&format!(" Currently stuck for {} seconds.", self.stuck_duration.as_secs()));
        }
        Some(summary)
    }

    pub fn rapid_switching(&self) -> bool {
        if self.history.len() < SWITCH_WINDOW {
            return false;
        }
        let apps: HashSet<Option<&str>> = self
            .history
            .iter()
            .rev()
            .take(SWITCH_WINDOW)
            .map(|entry| entry.app.as_deref())
            .collect();
        apps.len() >= RAPID_SWITCH_APPS
    }

    pub fn stress_stats(&self) -> StressStats {
        let Some(&current) = self.stress_series.back() else {
            return StressStats::default();
        };
        let count = self.stress_series.len() as f64;
        let avg = self.stress_series.iter().sum::<f64>() / count;
        let peak = self.stress_series.iter().copied().fold(f64::MIN, f64::max);
        let high = self.stress_series.iter().filter(|s| **s > HIGH_STRESS).count() as f64;

        StressStats {
            avg: round_to(avg, 2),
            peak: round_to(peak, 2),
            current: round_to(current, 2),
            high_stress_minutes: round_to(high * SAMPLE_INTERVAL_SECS / 60.0, 1),
        }
    }

    pub fn session_stats(&self) -> Option<SessionStats> {
        let (first, last) = (self.history.front()?, self.history.back()?);
        let mut state_distribution = BTreeMap::new();
        for entry in &self.history {
            *state_distribution.entry(entry.state.as_str().to_string()).or_insert(0) += 1;
        }
        Some(SessionStats {
            session_duration_minutes: round_to(last.at.saturating_duration_since(first.at).as_secs_f64() / 60.0, 1),
            total_analyses: self.history.len(),
            times_stuck: self.history.iter().filter(|e| e.stuck).count(),
            context_switches: self.context_switches,
            state_distribution,
            current_app: self.current_app.clone(),
            current_activity: self.current_activity.clone(),
            rapid_switching: self.rapid_switching(),
            stress_stats: self.stress_stats(),
        })
    }
}
