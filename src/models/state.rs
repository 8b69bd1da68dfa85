use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AffectiveState {
    Relaxed,
    DeepFocus,
    Stressed,
    Fatigued,
    Wired,
}

impl Default for AffectiveState {
    fn default() -> Self {
        AffectiveState::Relaxed
    }
}

impl AffectiveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AffectiveState::Relaxed => "RELAXED",
            AffectiveState::DeepFocus => "DEEP_FOCUS",
            AffectiveState::Stressed => "STRESSED",
            AffectiveState::Fatigued => "FATIGUED",
            AffectiveState::Wired => "WIRED",
        }
    }

    pub fn modifiers(&self) -> PersonalityModifiers {
        PersonalityModifiers::for_state(*self)
    }
}

/// Output of one classification: the discrete state and its 0.0-3.0 stress score.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Classification {
    pub state: AffectiveState,
    pub stress: f64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Minimal,
    Short,
    Medium,
    Detailed,
}

/// How the companion behaves in a given state.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PersonalityModifiers {
    /// Stuck-probability at or above which the companion speaks up.
    pub intervention_threshold: f64,
    pub verbosity: Verbosity,
    pub tone: &'static str,
    pub risk_sensitivity: &'static str,
    pub capture_interval_secs: u64,
    pub max_tokens: u32,
}

impl PersonalityModifiers {
    pub fn for_state(state: AffectiveState) -> Self {
        match state {
            AffectiveState::DeepFocus => Self {
                intervention_threshold: 0.9,
                verbosity: Verbosity::Minimal,
                tone: "silent_supportive",
                risk_sensitivity: "low",
                capture_interval_secs: 10,
                max_tokens: 30,
            },
            AffectiveState::Stressed => Self {
                intervention_threshold: 0.4,
                verbosity: Verbosity::Medium,
                tone: "warm_supportive",
                risk_sensitivity: "high",
                capture_interval_secs: 2,
                max_tokens: 100,
            },
            AffectiveState::Fatigued => Self {
                intervention_threshold: 0.3,
                verbosity: Verbosity::Short,
                tone: "protective",
                risk_sensitivity: "critical",
                capture_interval_secs: 3,
                max_tokens: 80,
            },
            AffectiveState::Relaxed => Self {
                intervention_threshold: 0.5,
                verbosity: Verbosity::Detailed,
                tone: "curious_exploratory",
                risk_sensitivity: "normal",
                capture_interval_secs: 5,
                max_tokens: 200,
            },
            AffectiveState::Wired => Self {
                intervention_threshold: 0.5,
                verbosity: Verbosity::Short,
                tone: "direct_action",
                risk_sensitivity: "medium",
                capture_interval_secs: 3,
                max_tokens: 60,
            },
        }
    }
}
