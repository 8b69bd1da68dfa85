//! Typed events pushed to subscribers. Serialized with a `type` tag so the
//! client can dispatch on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AffectiveState, Channel, Reading};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GhostEvent {
    BiometricUpdate(BiometricUpdate),
    StateChange(StateChange),
    Intervention(Box<InterventionEvent>),
    SleepMode { active: bool },
    PlantUpdate(PlantUpdate),
    AppFocusChange {
        app_type: String,
        timestamp: DateTime<Utc>,
    },
}

impl GhostEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GhostEvent::BiometricUpdate(_) => "biometric_update",
            GhostEvent::StateChange(_) => "state_change",
            GhostEvent::Intervention(_) => "intervention",
            GhostEvent::SleepMode { .. } => "sleep_mode",
            GhostEvent::PlantUpdate(_) => "plant_update",
            GhostEvent::AppFocusChange { .. } => "app_focus_change",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Live heart rate pushed over BLE within the freshness window.
    Ble,
    /// External wearable provider.
    Whoop,
    /// Simulator presets.
    Mock,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BiometricUpdate {
    pub source: DataSource,
    pub heart_rate: i64,
    pub recovery: i64,
    pub strain: f64,
    pub state: AffectiveState,
    pub sleep_performance: f64,
    pub hrv: f64,
    #[serde(rename = "estimated_stress")]
    pub estimated_stress: f64,
    pub spo2: f64,
    pub skin_temp: f64,
    pub provider_connected: bool,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

impl BiometricUpdate {
    pub fn new(
        reading: &Reading,
        state: AffectiveState,
        stress: f64,
        source: DataSource,
        provider_connected: bool,
    ) -> Self {
        Self {
            source,
            heart_rate: reading.heart_rate.round() as i64,
            recovery: reading.recovery.round() as i64,
            strain: round_to(reading.strain, 1),
            state,
            sleep_performance: round_to(reading.sleep_performance, 2),
            hrv: round_to(reading.hrv, 1),
            estimated_stress: round_to(stress, 2),
            spo2: round_to(reading.spo2, 1),
            skin_temp: round_to(reading.skin_temp, 1),
            provider_connected,
        }
    }
}

/// Which threshold explains a state transition.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum StateChangeReason {
    #[serde(rename = "Strain over 16")]
    HighStrain,
    #[serde(rename = "Recovery dropped below 40")]
    LowRecovery,
    #[serde(rename = "Poor sleep performance")]
    PoorSleep,
    #[serde(rename = "Biometric data changed")]
    DataChanged,
}

impl StateChangeReason {
    pub fn from_reading(reading: &Reading) -> Self {
        if reading.strain > 16.0 {
            StateChangeReason::HighStrain
        } else if reading.recovery < 40.0 {
            StateChangeReason::LowRecovery
        } else if reading.sleep_performance < 0.7 {
            StateChangeReason::PoorSleep
        } else {
            StateChangeReason::DataChanged
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StateChange {
    pub from: AffectiveState,
    pub to: AffectiveState,
    pub reason: StateChangeReason,
    pub estimated_stress: f64,
}

/// Gamification side-channel: either a relative change or an absolute health.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PlantUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<u8>,
}

impl PlantUpdate {
    pub fn delta(delta: i32) -> Self {
        Self {
            delta: Some(delta),
            health: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InterventionReason {
    FatigueFirewall,
    StressFirewall,
    RiskyActionDetected,
    MistakeDetected,
    StuckDetected,
    HelpOpportunity,
}

impl InterventionReason {
    pub fn is_firewall(&self) -> bool {
        matches!(
            self,
            InterventionReason::FatigueFirewall | InterventionReason::StressFirewall
        )
    }

    /// Reasons whose message is templated locally instead of generated.
    pub fn is_instant(&self) -> bool {
        self.is_firewall() || *self == InterventionReason::RiskyActionDetected
    }
}

/// Button labels on an intervention, echoed back verbatim as feedback actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UserAction {
    #[serde(rename = "Thanks")]
    Thanks,
    #[serde(rename = "Not Now")]
    NotNow,
    #[serde(rename = "Apply Fix")]
    ApplyFix,
    #[serde(rename = "Show More")]
    ShowMore,
    #[serde(rename = "Save Draft")]
    SaveDraft,
    #[serde(rename = "Do It Anyway")]
    DoItAnyway,
    #[serde(rename = "Remind Later")]
    RemindLater,
    #[serde(rename = "Cancel")]
    Cancel,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InterventionEvent {
    pub id: String,
    pub message: String,
    pub priority: Priority,
    pub reason: InterventionReason,
    pub state: AffectiveState,
    pub buttons: Vec<UserAction>,
    pub context: String,
    pub code_suggestion: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub risky: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_type: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biometric: Option<BiometricUpdate>,
}
