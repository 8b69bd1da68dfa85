use chrono::{DateTime, Utc};
use rand::Rng;

use crate::models::{
    AffectiveState, AnalysisResult, InterventionEvent, InterventionReason, Priority, UserAction,
};

use super::fallback::fallback_phrase;

pub fn priority(reason: InterventionReason) -> Priority {
    match reason {
        InterventionReason::FatigueFirewall
        | InterventionReason::StressFirewall
        | InterventionReason::RiskyActionDetected => Priority::Critical,
        InterventionReason::MistakeDetected => Priority::High,
        InterventionReason::HelpOpportunity => Priority::Low,
        InterventionReason::StuckDetected => Priority::Medium,
    }
}

pub fn buttons(reason: InterventionReason, has_code_suggestion: bool) -> Vec<UserAction> {
    match reason {
        InterventionReason::RiskyActionDetected => {
            vec![UserAction::Cancel, UserAction::DoItAnyway, UserAction::SaveDraft]
        }
        InterventionReason::FatigueFirewall | InterventionReason::StressFirewall => {
            vec![UserAction::SaveDraft, UserAction::DoItAnyway, UserAction::RemindLater]
        }
        _ if has_code_suggestion => vec![UserAction::ApplyFix, UserAction::ShowMore, UserAction::NotNow],
        _ => vec![UserAction::Thanks, UserAction::NotNow],
    }
}

/// Deterministic message for the firewall and risky paths, which must not
/// wait on the generator. Returns `None` for every other reason.
pub fn instant_message(
    reason: InterventionReason,
    analysis: &AnalysisResult,
    stress: f64,
    hrv_baseline: f64,
) -> Option<String> {
    let subject = analysis
        .risky_description
        .as_deref()
        .or(analysis.mistake_description.as_deref())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("this action");

    let message = match reason {
        InterventionReason::FatigueFirewall => format!(
            "FATIGUE FIREWALL: HRV {hrv_baseline:.0}ms, stress {stress:.1}/3.0. '{subject}' is irreversible. You're too exhausted for this. Save your work and rest first."
        ),
        InterventionReason::StressFirewall => format!(
            "STRESS ALERT: HRV {hrv_baseline:.0}ms, stress {stress:.1}/3.0. '{subject}' is dangerous when you're this stressed. Take a breath, then decide."
        ),
        InterventionReason::RiskyActionDetected => {
            format!("Risky command detected: '{subject}'. Double-check before running this.")
        }
        _ => return None,
    };
    Some(message)
}

/// Generated text first, then the analysis' own suggestion, then a canned phrase.
pub fn resolve_message<R: Rng + ?Sized>(
    generated: Option<String>,
    analysis: &AnalysisResult,
    state: AffectiveState,
    rng: &mut R,
) -> String {
    generated
        .or_else(|| analysis.suggested_message().map(str::to_string))
        .unwrap_or_else(|| fallback_phrase(state, rng).to_string())
}

pub fn build_event(
    reason: InterventionReason,
    state: AffectiveState,
    analysis: &AnalysisResult,
    message: String,
    timestamp: DateTime<Utc>,
) -> InterventionEvent {
    let code_suggestion = analysis.code_suggestion().map(str::to_string);
    InterventionEvent {
        id: uuid::Uuid::new_v4().to_string(),
        message,
        priority: priority(reason),
        reason,
        state,
        buttons: buttons(reason, code_suggestion.is_some()),
        context: analysis.context_summary.clone(),
        code_suggestion,
        timestamp,
        risky: reason == InterventionReason::RiskyActionDetected,
        app_type: None,
        biometric: None,
    }
}
