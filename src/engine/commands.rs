use anyhow::{Context, Result};
use chrono::Utc;

use crate::biometrics::classifier::LIVE_HR_FRESHNESS;
use crate::biometrics::simulator::preset_name;
use crate::hub::ControlMessage;
use crate::models::{
    BiometricUpdate, DataSource, GhostEvent, InterventionEvent, LiveHeartRate, PlantUpdate, UserAction,
};
use crate::policy::FeedbackEffect;
use crate::sleep::{SleepState, DISCONNECT_GRACE};

use super::status::StatusSnapshot;
use super::{clock, GhostEngine};

const ENABLE_LOGS: bool = true;
use crate::{log_debug, log_info};

const APPLY_FIX_REWARD: i32 = 20;

/// Direct answer to the client that sent a control message.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Event(GhostEvent),
    Status(Box<StatusSnapshot>),
    History(Vec<InterventionEvent>),
}

impl Reply {
    pub fn to_json(&self) -> Result<String> {
        match self {
            Reply::Event(event) => serde_json::to_string(event),
            Reply::Status(status) => serde_json::to_string(&serde_json::json!({
                "type": "status",
                "status": status,
            })),
            Reply::History(history) => serde_json::to_string(&serde_json::json!({
                "type": "history",
                "interventions": history,
            })),
        }
        .context("failed to serialize reply")
    }
}

impl GhostEngine {
    /// Apply one inbound control message. Returns the reply owed to the sender, if any.
    pub async fn handle_message(&self, message: ControlMessage) -> Result<Option<Reply>> {
        match message {
            ControlMessage::Feedback { action } => {
                self.feedback(action).await;
                Ok(None)
            }
            ControlMessage::ContentUpdate(update) => {
                let now = clock();
                let observation = update
                    .into_observation(now)
                    .context("rejected content update")?;
                self.inner.bio.lock().await.last_activity = Some(now);
                self.inner.sensing.lock().await.pending.submit(observation);
                Ok(None)
            }
            ControlMessage::MockState { state } => self.mock_state(state).await.map(Some),
            ControlMessage::LiveHr { heart_rate } => {
                match LiveHeartRate::accept(heart_rate, clock()) {
                    Some(live) => self.inner.bio.lock().await.live_hr = Some(live),
                    None => log_debug!("[bio] ignoring implausible live heart rate {heart_rate}"),
                }
                Ok(None)
            }
            ControlMessage::BleDisconnected => {
                self.ble_disconnected().await;
                Ok(None)
            }
            ControlMessage::BleReconnected => {
                self.ble_reconnected().await;
                Ok(None)
            }
            ControlMessage::AppFocus { app_type } => {
                if let Some(app_type) = app_type.filter(|a| !a.is_empty()) {
                    self.publish(GhostEvent::AppFocusChange {
                        app_type,
                        timestamp: Utc::now(),
                    })
                    .await;
                }
                Ok(None)
            }
            ControlMessage::Status => Ok(Some(Reply::Status(Box::new(self.status().await)))),
            ControlMessage::History => Ok(Some(Reply::History(self.intervention_history().await))),
        }
    }

    async fn feedback(&self, action: UserAction) {
        let suppression = self.inner.settings.feedback_suppression();
        let effect = self.inner.policy.lock().await.feedback(action, clock(), suppression);
        log_debug!("[policy] feedback {action:?} -> {effect:?}");
        if effect == FeedbackEffect::ResetAnalysis {
            self.inner.sensing.lock().await.content.clear_analyzed();
            self.publish(GhostEvent::PlantUpdate(PlantUpdate::delta(APPLY_FIX_REWARD))).await;
        }
    }

    /// Switch the simulator to preset `number`, make it authoritative for the
    /// override window and reclassify at once.
    async fn mock_state(&self, number: u8) -> Result<Reply> {
        let now = clock();
        let provider_connected = self.provider_connected();
        let (update, change) = {
            let mut bio = self.inner.bio.lock().await;
            bio.simulator
                .set_preset(number, now)
                .with_context(|| format!("cannot switch to preset {number}"))?;
            bio.override_until = Some(now + self.inner.settings.mock_override());

            let reading = bio.simulator.reading(now);
            let live = bio.live_hr.filter(|hr| hr.is_fresh(now, LIVE_HR_FRESHNESS));
            let outcome = bio
                .classifier
                .update(&reading, live.as_ref(), now)
                .context("simulator produced an invalid reading")?;
            bio.latest = Some((reading, DataSource::Mock));
            let update = BiometricUpdate::new(
                &reading,
                outcome.classification.state,
                outcome.classification.stress,
                DataSource::Mock,
                provider_connected,
            );
            (update, outcome.change)
        };

        if let Some(state) = preset_name(number) {
            log_info!("[bio] manual override to preset {number} ({})", state.as_str());
        }
        self.inner.policy.lock().await.reset_timers();
        self.inner.sensing.lock().await.content.clear_analyzed();
        if let Some(change) = change {
            self.publish(GhostEvent::StateChange(change)).await;
        }
        Ok(Reply::Event(GhostEvent::BiometricUpdate(update)))
    }

    async fn ble_disconnected(&self) {
        self.inner.sleep.lock().await.on_disconnect();
        let engine = self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(DISCONNECT_GRACE).await;
            let transition = engine.inner.sleep.lock().await.on_disconnect_timeout();
            if let Some(state) = transition {
                engine.publish_sleep(state).await;
            }
        });
        if let Some(previous) = self.inner.sleep_timer.lock().await.replace(timer) {
            previous.abort();
        }
        log_info!("[sleep] BLE disconnected, {DISCONNECT_GRACE:?} sleep timer started");
    }

    async fn ble_reconnected(&self) {
        self.cancel_sleep_timer().await;
        let transition = self.inner.sleep.lock().await.on_reconnect();
        if let Some(state) = transition {
            self.publish_sleep(state).await;
        }
    }

    pub(crate) async fn cancel_sleep_timer(&self) {
        if let Some(timer) = self.inner.sleep_timer.lock().await.take() {
            timer.abort();
        }
    }

    async fn publish_sleep(&self, state: SleepState) {
        self.publish(GhostEvent::SleepMode {
            active: state.is_asleep(),
        })
        .await;
    }
}
