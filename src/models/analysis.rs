//! Judgment returned by the content/vision analysis service.
//!
//! The core only reads the numeric and boolean fields; the free-text fields are
//! passed through to the tracker, the message generator and the client.

use serde::{Deserialize, Serialize};

/// Stuck-probability above which an entry counts as "stuck".
pub const STUCK_PROBABILITY: f64 = 0.6;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisResult {
    pub app: Option<String>,
    pub activity: Option<String>,
    pub stuck_probability: f64,
    pub stuck_reason: Option<String>,
    pub mistake_detected: bool,
    pub mistake_description: Option<String>,
    pub help_opportunity: Option<String>,
    pub risky_action: bool,
    pub risky_description: Option<String>,
    pub suggested_intervention: Option<SuggestedIntervention>,
    pub context_summary: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SuggestedIntervention {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
    pub priority: Option<String>,
    pub code_suggestion: Option<String>,
}

impl AnalysisResult {
    pub fn is_stuck(&self) -> bool {
        self.stuck_probability > STUCK_PROBABILITY
    }

    pub fn has_help_opportunity(&self) -> bool {
        self.help_opportunity
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }

    pub fn suggested_message(&self) -> Option<&str> {
        self.suggested_intervention
            .as_ref()
            .and_then(|s| s.message.as_deref())
            .filter(|m| !m.trim().is_empty())
    }

    pub fn code_suggestion(&self) -> Option<&str> {
        self.suggested_intervention
            .as_ref()
            .and_then(|s| s.code_suggestion.as_deref())
            .filter(|c| !c.trim().is_empty())
    }
}
