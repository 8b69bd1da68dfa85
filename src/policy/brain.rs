//! Contract for the external message generator (an LLM in production).

use async_trait::async_trait;
use std::time::Duration;

use crate::error::GhostError;
use crate::models::{AffectiveState, AnalysisResult, Verbosity};

const ENABLE_LOGS: bool = true;
use crate::log_warn;

/// Everything the generator needs to phrase one intervention.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePrompt {
    pub state: AffectiveState,
    pub stress: f64,
    pub hrv_baseline: f64,
    pub max_tokens: u32,
    pub tone: &'static str,
    pub verbosity: Verbosity,
    pub analysis: AnalysisResult,
    /// Context summaries of the most recent analyses, oldest first.
    pub recent_context: Vec<String>,
}

impl MessagePrompt {
    /// Plain-text rendering for generators that take a single user message.
    pub fn render(&self) -> String {
        let a = &self.analysis;
        let or_none = |value: Option<&str>| value.unwrap_or("none").to_string();
        let mut text = format!(
            "Screen analysis:\n- App: {}\n- Activity: {}\n- Stuck probability: {}\n- Stuck reason: {}\n- Mistake detected: {}\n- Mistake: {}\n- Help opportunity: {}\n- Risky action: {}\n- Risky description: {}\n",
            a.app.as_deref().unwrap_or("unknown"),
            a.activity.as_deref().unwrap_or("unknown"),
            a.stuck_probability,
            or_none(a.stuck_reason.as_deref()),
            a.mistake_detected,
            or_none(a.mistake_description.as_deref()),
            or_none(a.help_opportunity.as_deref()),
            a.risky_action,
            or_none(a.risky_description.as_deref()),
        );
        if !self.recent_context.is_empty() {
            text.push_str(&format!("\nRecent activity: {}\n", self.recent_context.join(" -> ")));
        }
        text.push_str(&format!(
            "\nBiometric state: {}\nEstimated stress level: {:.1}/3.0\nHRV baseline: {:.0}ms\n\nGenerate a Ghost intervention. Be concise. Match the personality for {} state.",
            self.state.as_str(),
            self.stress,
            self.hrv_baseline,
            self.state.as_str(),
        ));
        text
    }
}

#[async_trait]
pub trait MessageGenerator: Send + Sync {
    async fn generate(&self, prompt: &MessagePrompt) -> Result<String, GhostError>;
}

/// Bounded call to the generator. Failures, timeouts and blank replies all
/// come back as `None`.
pub async fn generate_message(
    generator: &dyn MessageGenerator,
    prompt: &MessagePrompt,
    timeout: Duration,
) -> Option<String> {
    match tokio::time::timeout(timeout, generator.generate(prompt)).await {
        Ok(Ok(message)) if !message.trim().is_empty() => Some(message.trim().to_string()),
        Ok(Ok(_)) => None,
        Ok(Err(err)) => {
            log_warn!("[brain] message generation failed: {err}");
            None
        }
        Err(_) => {
            log_warn!("[brain] message generation timed out after {timeout:?}");
            None
        }
    }
}
