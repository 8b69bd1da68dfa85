use serde::Serialize;
use std::time::Instant;

use crate::models::{AffectiveState, AnalysisResult, Classification, InterventionReason};

use super::state::{PolicyState, RISKY_COOLDOWN};

/// Stress above which a mistake escalates to the stress firewall.
const MISTAKE_STRESS: f64 = 2.0;
/// Help opportunities fire at this fraction of the stuck threshold.
const HELP_THRESHOLD_FACTOR: f64 = 0.7;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    Cooldown,
    ProtectingFlow,
    NoInterventionNeeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Intervene(InterventionReason),
    Suppress(SuppressReason),
}

/// First applicable rule wins. Risky actions are checked before the normal
/// cooldown and only honor the shorter risky cooldown.
pub fn decide(
    analysis: &AnalysisResult,
    classification: Classification,
    policy: &PolicyState,
    now: Instant,
) -> Decision {
    let state = classification.state;
    let since_last = policy.since_last(now);

    if analysis.risky_action {
        if since_last.is_some_and(|elapsed| elapsed < RISKY_COOLDOWN) {
            return Decision::Suppress(SuppressReason::Cooldown);
        }
        return Decision::Intervene(match state {
            AffectiveState::Fatigued => InterventionReason::FatigueFirewall,
            AffectiveState::Stressed => InterventionReason::StressFirewall,
            _ => InterventionReason::RiskyActionDetected,
        });
    }

    if since_last.is_some_and(|elapsed| elapsed < policy.effective_cooldown()) {
        return Decision::Suppress(SuppressReason::Cooldown);
    }

    if analysis.mistake_detected {
        if classification.stress > MISTAKE_STRESS {
            return Decision::Intervene(InterventionReason::StressFirewall);
        }
        if state == AffectiveState::Fatigued {
            return Decision::Intervene(InterventionReason::FatigueFirewall);
        }
        return Decision::Intervene(InterventionReason::MistakeDetected);
    }

    let threshold = state.modifiers().intervention_threshold;
    if analysis.stuck_probability >= threshold {
        return Decision::Intervene(InterventionReason::StuckDetected);
    }

    if analysis.has_help_opportunity()
        && matches!(state, AffectiveState::Relaxed | AffectiveState::Stressed)
        && analysis.stuck_probability >= threshold * HELP_THRESHOLD_FACTOR
    {
        return Decision::Intervene(InterventionReason::HelpOpportunity);
    }

    if state == AffectiveState::DeepFocus {
        return Decision::Suppress(SuppressReason::ProtectingFlow);
    }
    Decision::Suppress(SuppressReason::NoInterventionNeeded)
}
