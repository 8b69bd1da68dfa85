use serde::Serialize;

use crate::context::SessionStats;
use crate::models::{AffectiveState, AnalysisResult, BiometricUpdate, DataSource, InterventionEvent};
use crate::policy::PolicyStatus;

use super::{clock, GhostEngine};

/// Interventions returned by a history request.
pub const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct InterventionTotals {
    pub total: u32,
    pub accepted: u32,
    pub ignored: u32,
}

/// Point-in-time view of the engine for status requests.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusSnapshot {
    pub state: AffectiveState,
    pub policy_status: PolicyStatus,
    pub reading: BiometricUpdate,
    pub interventions: InterventionTotals,
    pub session: Option<SessionStats>,
    /// The simulator is authoritative, either by override or for lack of a provider.
    pub mock_mode: bool,
    pub provider_connected: bool,
    pub estimated_stress: f64,
    pub hrv_baseline: f64,
    pub hrv_current: Option<f64>,
    pub last_analysis: Option<AnalysisResult>,
    pub sleep_mode: bool,
}

impl GhostEngine {
    pub async fn status(&self) -> StatusSnapshot {
        let now = clock();
        let reading = self.biometric_snapshot(now).await;
        let (current, hrv_baseline, hrv_current, override_active) = {
            let bio = self.inner.bio.lock().await;
            (
                bio.classifier.current(),
                bio.classifier.baseline(),
                bio.latest.map(|(r, _)| r.hrv),
                bio.override_active(now),
            )
        };
        let (policy_status, interventions, last_analysis) = {
            let policy = self.inner.policy.lock().await;
            let state = policy.state();
            (
                state.status(now),
                InterventionTotals {
                    total: state.intervention_count,
                    accepted: state.accepted,
                    ignored: state.ignored,
                },
                policy.last_analysis().cloned(),
            )
        };
        let session = self.inner.tracker.lock().await.session_stats();
        let sleep_mode = self.inner.sleep.lock().await.state().is_asleep();

        StatusSnapshot {
            state: current.state,
            policy_status,
            mock_mode: override_active || reading.source == DataSource::Mock,
            provider_connected: reading.provider_connected,
            reading,
            interventions,
            session,
            estimated_stress: current.stress,
            hrv_baseline,
            hrv_current,
            last_analysis,
            sleep_mode,
        }
    }

    /// The most recent interventions, oldest first.
    pub async fn intervention_history(&self) -> Vec<InterventionEvent> {
        self.inner.policy.lock().await.history(HISTORY_LIMIT)
    }
}
