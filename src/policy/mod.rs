//! Intervention policy: when to speak up, and what to say.

pub mod brain;
pub mod compose;
pub mod decision;
pub mod fallback;
pub mod state;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::models::{AnalysisResult, Classification, InterventionEvent, UserAction};

pub use brain::{generate_message, MessageGenerator, MessagePrompt};
pub use decision::{decide, Decision, SuppressReason};
pub use state::{FeedbackEffect, PolicyState, PolicyStatus};

const RECENT_ANALYSES: usize = 20;
const PROMPT_CONTEXT: usize = 5;
const MAX_INTERVENTIONS: usize = 50;

/// Counters, recent analyses and the published-intervention history.
#[derive(Debug, Default)]
pub struct InterventionPolicy {
    state: PolicyState,
    recent: VecDeque<AnalysisResult>,
    history: VecDeque<InterventionEvent>,
}

impl InterventionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PolicyState {
        &self.state
    }

    /// Remember the analysis and decide on it. Nothing is committed until
    /// `commit` is called with the finished event.
    pub fn evaluate(&mut self, analysis: &AnalysisResult, classification: Classification, now: Instant) -> Decision {
        self.recent.push_back(analysis.clone());
        while self.recent.len() > RECENT_ANALYSES {
            self.recent.pop_front();
        }
        decide(analysis, classification, &self.state, now)
    }

    pub fn prompt(&self, analysis: &AnalysisResult, classification: Classification, hrv_baseline: f64) -> MessagePrompt {
        let modifiers = classification.state.modifiers();
        let skip = self.recent.len().saturating_sub(PROMPT_CONTEXT);
        MessagePrompt {
            state: classification.state,
            stress: classification.stress,
            hrv_baseline,
            max_tokens: modifiers.max_tokens,
            tone: modifiers.tone,
            verbosity: modifiers.verbosity,
            analysis: analysis.clone(),
            recent_context: self
                .recent
                .iter()
                .skip(skip)
                .map(|a| a.context_summary.clone())
                .collect(),
        }
    }

    /// Records a published intervention: bumps the counters, pauses analysis
    /// for `pause`, and appends to the capped history.
    pub fn commit(&mut self, event: InterventionEvent, content_hash: Option<String>, pause: Duration, now: Instant) {
        self.state.record_intervention(now, content_hash, pause);
        self.history.push_back(event);
        while self.history.len() > MAX_INTERVENTIONS {
            self.history.pop_front();
        }
    }

    pub fn feedback(&mut self, action: UserAction, now: Instant, suppression: Duration) -> FeedbackEffect {
        self.state.feedback(action, now, suppression)
    }

    pub fn analysis_blocked(&self, content_hash: &str, now: Instant) -> bool {
        self.state.analysis_paused(now) || self.state.is_suppressed(content_hash, now)
    }

    pub fn reset_timers(&mut self) {
        self.state.reset_timers();
    }

    pub fn last_analysis(&self) -> Option<&AnalysisResult> {
        self.recent.back()
    }

    /// The most recent `limit` interventions, oldest first.
    pub fn history(&self, limit: usize) -> Vec<InterventionEvent> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).cloned().collect()
    }
}
