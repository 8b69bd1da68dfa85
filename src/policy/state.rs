use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::models::UserAction;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);
/// Cooldown once the user has ignored several interventions in a row.
pub const BACKOFF_COOLDOWN: Duration = Duration::from_secs(60);
/// Cooldown while the user accepts more than they ignore.
pub const ENGAGED_COOLDOWN: Duration = Duration::from_secs(20);
/// Minimum spacing between risky-action interventions.
pub const RISKY_COOLDOWN: Duration = Duration::from_secs(10);
const BACKOFF_AFTER_IGNORED: u32 = 3;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyStatus {
    Idle,
    Cooling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedbackKind {
    Accepted,
    Ignored,
    Neutral,
}

fn feedback_kind(action: UserAction) -> FeedbackKind {
    match action {
        UserAction::Thanks | UserAction::ApplyFix | UserAction::SaveDraft | UserAction::ShowMore => {
            FeedbackKind::Accepted
        }
        UserAction::NotNow | UserAction::DoItAnyway => FeedbackKind::Ignored,
        UserAction::RemindLater | UserAction::Cancel | UserAction::Other => FeedbackKind::Neutral,
    }
}

/// What the caller still has to do after feedback was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackEffect {
    /// The fix was applied: forget analyzed content and reward the user.
    ResetAnalysis,
    /// The last intervened content is muted for the suppression window.
    Suppressed,
    None,
}

/// Process-wide adaptive counters. Lives behind one mutex in the engine and
/// is never persisted.
#[derive(Debug, Default)]
pub struct PolicyState {
    pub last_intervention: Option<Instant>,
    pub accepted: u32,
    pub ignored: u32,
    pub intervention_count: u32,
    /// Analysis is paused until this instant.
    pub cooldown_until: Option<Instant>,
    suppressed: HashMap<String, Instant>,
    last_intervention_hash: Option<String>,
}

impl PolicyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effective_cooldown(&self) -> Duration {
        if self.ignored >= BACKOFF_AFTER_IGNORED {
            BACKOFF_COOLDOWN
        } else if self.accepted > self.ignored {
            ENGAGED_COOLDOWN
        } else {
            DEFAULT_COOLDOWN
        }
    }

    pub fn since_last(&self, now: Instant) -> Option<Duration> {
        self.last_intervention
            .map(|at| now.saturating_duration_since(at))
    }

    pub fn analysis_paused(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    pub fn status(&self, now: Instant) -> PolicyStatus {
        let cooling = self
            .since_last(now)
            .is_some_and(|elapsed| elapsed < self.effective_cooldown());
        if cooling || self.analysis_paused(now) {
            PolicyStatus::Cooling
        } else {
            PolicyStatus::Idle
        }
    }

    pub fn is_suppressed(&self, hash: &str, now: Instant) -> bool {
        self.suppressed.get(hash).is_some_and(|until| now < *until)
    }

    pub fn record_intervention(&mut self, now: Instant, content_hash: Option<String>, pause: Duration) {
        self.last_intervention = Some(now);
        self.intervention_count += 1;
        self.cooldown_until = Some(now + pause);
        self.last_intervention_hash = content_hash;
    }

    pub fn feedback(&mut self, action: UserAction, now: Instant, suppression: Duration) -> FeedbackEffect {
        match feedback_kind(action) {
            FeedbackKind::Accepted => {
                self.accepted += 1;
                self.ignored = self.ignored.saturating_sub(1);
            }
            FeedbackKind::Ignored => self.ignored += 1,
            FeedbackKind::Neutral => {}
        }

        if action == UserAction::ApplyFix {
            self.cooldown_until = None;
            self.suppressed.clear();
            return FeedbackEffect::ResetAnalysis;
        }

        let Some(hash) = self.last_intervention_hash.clone() else {
            return FeedbackEffect::None;
        };
        self.suppressed.insert(hash, now + suppression);
        self.suppressed.retain(|_, until| *until > now);
        FeedbackEffect::Suppressed
    }

    /// Clears every timer so a manual state switch takes effect at once.
    /// Feedback tallies are kept.
    pub fn reset_timers(&mut self) {
        self.last_intervention = None;
        self.cooldown_until = None;
        self.suppressed.clear();
    }
}
