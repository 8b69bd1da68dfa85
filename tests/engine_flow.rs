use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::Receiver;

use ghost_lib::analysis::{AnalysisRequest, AnalysisService, OfflineAnalyzer, RiskyCommandScreen};
use ghost_lib::biometrics::BiometricSource;
use ghost_lib::engine::{Collaborators, GhostEngine, InterventionTotals, Reply, TickOutcome};
use ghost_lib::error::GhostError;
use ghost_lib::hub::{ContentUpdate, ControlMessage};
use ghost_lib::models::{
    AffectiveState, AnalysisResult, Channel, DataSource, GhostEvent, InterventionReason, PlantUpdate,
    Priority, Reading, StateChangeReason, SuggestedIntervention, UserAction,
};
use ghost_lib::policy::SuppressReason;
use ghost_lib::settings::Settings;
use ghost_lib::sleep::DISCONNECT_GRACE;

/// Records every request and answers with a fixed result, optionally
/// failing one numbered call.
struct ScriptedAnalyzer {
    result: AnalysisResult,
    fail_call: Option<usize>,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl ScriptedAnalyzer {
    fn new(result: AnalysisResult) -> Arc<Self> {
        Arc::new(Self {
            result,
            fail_call: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Fails the `call`-th request (1-based).
    fn failing_on(result: AnalysisResult, call: usize) -> Arc<Self> {
        Arc::new(Self {
            result,
            fail_call: Some(call),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl AnalysisService for ScriptedAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, GhostError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        if self.fail_call == Some(call) {
            return Err(GhostError::AnalysisError("upstream returned 503".into()));
        }
        Ok(self.result.clone())
    }
}

/// Wearable provider with a fixed answer. A failed refresh drops the token.
struct ScriptedProvider {
    access: AtomicBool,
    refresh_ok: bool,
    answer: Result<Option<Reading>, GhostError>,
}

impl ScriptedProvider {
    fn serving(reading: Reading) -> Arc<Self> {
        Arc::new(Self {
            access: AtomicBool::new(true),
            refresh_ok: true,
            answer: Ok(Some(reading)),
        })
    }

    fn expired_for_good() -> Arc<Self> {
        Arc::new(Self {
            access: AtomicBool::new(true),
            refresh_ok: false,
            answer: Err(GhostError::AuthExpired),
        })
    }
}

#[async_trait]
impl BiometricSource for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn has_access(&self) -> bool {
        self.access.load(Ordering::SeqCst)
    }

    fn expires_in(&self) -> Option<Duration> {
        None
    }

    async fn refresh_auth(&self) -> bool {
        if !self.refresh_ok {
            self.access.store(false, Ordering::SeqCst);
        }
        self.refresh_ok
    }

    async fn fetch(&self) -> Result<Option<Reading>, GhostError> {
        self.answer.clone()
    }
}

fn rested_reading() -> Reading {
    Reading {
        heart_rate: 60.0,
        recovery: 85.0,
        strain: 4.5,
        sleep_performance: 0.92,
        hrv: 72.0,
        spo2: 98.0,
        skin_temp: 33.5,
    }
}

fn engine_with(analyzer: Arc<dyn AnalysisService>) -> GhostEngine {
    GhostEngine::new(
        Settings::default(),
        Collaborators {
            analyzer,
            provider: None,
            generator: None,
        },
    )
}

fn engine_with_provider(provider: Arc<dyn BiometricSource>) -> GhostEngine {
    GhostEngine::new(
        Settings::default(),
        Collaborators {
            analyzer: Arc::new(OfflineAnalyzer),
            provider: Some(provider),
            generator: None,
        },
    )
}

fn content(channel: Channel, text: &str) -> ControlMessage {
    ControlMessage::ContentUpdate(ContentUpdate {
        app_type: channel,
        content: text.to_string(),
        ..Default::default()
    })
}

async fn send(engine: &GhostEngine, message: ControlMessage) -> Option<Reply> {
    engine.handle_message(message).await.unwrap()
}

fn drain(rx: &mut Receiver<GhostEvent>) -> Vec<GhostEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn stuck_analysis() -> AnalysisResult {
    AnalysisResult {
        app: Some("editor".into()),
        activity: Some("debugging".into()),
        stuck_probability: 0.95,
        suggested_intervention: Some(SuggestedIntervention {
            message: Some("Try printing the loop index.".into()),
            ..Default::default()
        }),
        context_summary: "Debugging an off-by-one".into(),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn new_subscriber_gets_biometric_snapshot() {
    let engine = engine_with(Arc::new(OfflineAnalyzer));
    let mut rx = engine.subscribe().await;
    let Some(GhostEvent::BiometricUpdate(update)) = rx.recv().await else {
        panic!("expected biometric snapshot");
    };
    assert_eq!(update.source, DataSource::Mock);
    assert_eq!(update.state, AffectiveState::Relaxed);
    assert_eq!(update.heart_rate, 68);
    assert!(!update.provider_connected);
}

#[tokio::test(start_paused = true)]
async fn risky_terminal_command_gets_critical_intervention() {
    let engine = GhostEngine::new(Settings::default(), Collaborators::offline());
    let mut rx = engine.subscribe().await;
    drain(&mut rx);

    send(&engine, content(Channel::Terminal, "user@box:~$ rm -rf / --no-preserve-root")).await;
    let outcome = engine.run_intervention_tick().await;
    assert_eq!(outcome, TickOutcome::Intervened(InterventionReason::RiskyActionDetected));

    let events = drain(&mut rx);
    let Some(GhostEvent::Intervention(event)) = events.first() else {
        panic!("expected intervention, got {events:?}");
    };
    assert_eq!(event.priority, Priority::Critical);
    assert!(event.risky);
    assert_eq!(
        event.buttons,
        vec![UserAction::Cancel, UserAction::DoItAnyway, UserAction::SaveDraft]
    );
    assert!(event.message.starts_with("Risky command detected"));
    assert_eq!(event.app_type, Some(Channel::Terminal));
    assert_eq!(events.get(1), Some(&GhostEvent::PlantUpdate(PlantUpdate::delta(-25))));

    let history = engine.intervention_history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, event.id);
}

#[tokio::test(start_paused = true)]
async fn short_content_stays_pending() {
    let analyzer = ScriptedAnalyzer::new(AnalysisResult::default());
    let engine = engine_with(analyzer.clone());
    send(&engine, content(Channel::Code, "x = 1")).await;
    assert_eq!(engine.run_intervention_tick().await, TickOutcome::Idle);
    assert_eq!(analyzer.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn unchanged_content_is_analyzed_again_only_when_stuck() {
    let analyzer = ScriptedAnalyzer::new(AnalysisResult::default());
    let engine = engine_with(analyzer.clone());
    let code = "fn main() {\n    let total = items.iter().sum();\n}";

    let mut outcomes = Vec::new();
    for _ in 0..5 {
        send(&engine, content(Channel::Code, code)).await;
        outcomes.push(engine.run_intervention_tick().await);
        tokio::time::advance(Duration::from_secs(5)).await;
    }

    assert_eq!(analyzer.calls(), 2);
    assert_eq!(
        outcomes,
        vec![
            TickOutcome::NoIntervention(SuppressReason::NoInterventionNeeded),
            TickOutcome::Skipped,
            TickOutcome::NoIntervention(SuppressReason::NoInterventionNeeded),
            TickOutcome::Skipped,
            TickOutcome::Skipped,
        ]
    );
    let requests = analyzer.requests.lock().unwrap();
    assert_eq!(requests[0].stuck_hint, None);
    assert!(requests[1]
        .stuck_hint
        .as_deref()
        .is_some_and(|hint| hint.contains("3 consecutive checks")));
}

#[tokio::test(start_paused = true)]
async fn failed_stuck_analysis_is_retried_on_the_next_repeat() {
    let analyzer = ScriptedAnalyzer::failing_on(AnalysisResult::default(), 2);
    let engine = engine_with(analyzer.clone());
    let code = "fn main() {\n    let total = items.iter().sum();\n}";

    let mut outcomes = Vec::new();
    for _ in 0..5 {
        send(&engine, content(Channel::Code, code)).await;
        outcomes.push(engine.run_intervention_tick().await);
        tokio::time::advance(Duration::from_secs(5)).await;
    }

    assert_eq!(
        outcomes,
        vec![
            TickOutcome::NoIntervention(SuppressReason::NoInterventionNeeded),
            TickOutcome::Skipped,
            TickOutcome::AnalysisFailed,
            TickOutcome::NoIntervention(SuppressReason::NoInterventionNeeded),
            TickOutcome::Skipped,
        ]
    );
    assert_eq!(analyzer.calls(), 3);
    let requests = analyzer.requests.lock().unwrap();
    assert!(requests[2]
        .stuck_hint
        .as_deref()
        .is_some_and(|hint| hint.contains("4 consecutive checks")));
}

#[tokio::test(start_paused = true)]
async fn stuck_streak_during_pause_is_forwarded_once_the_pause_ends() {
    let analyzer = ScriptedAnalyzer::new(stuck_analysis());
    let engine = engine_with(analyzer.clone());
    let code = "for i in 0..=items.len() { println!(\"{}\", items[i]); }";

    let mut outcomes = Vec::new();
    for _ in 0..6 {
        send(&engine, content(Channel::Code, code)).await;
        outcomes.push(engine.run_intervention_tick().await);
        tokio::time::advance(Duration::from_secs(2)).await;
    }

    // The 8s post-intervention pause covers the checks at 2s, 4s and 6s.
    assert_eq!(
        outcomes,
        vec![
            TickOutcome::Intervened(InterventionReason::StuckDetected),
            TickOutcome::Skipped,
            TickOutcome::Skipped,
            TickOutcome::Skipped,
            TickOutcome::NoIntervention(SuppressReason::Cooldown),
            TickOutcome::Skipped,
        ]
    );
    assert_eq!(analyzer.calls(), 2);
    let requests = analyzer.requests.lock().unwrap();
    assert!(requests[1]
        .stuck_hint
        .as_deref()
        .is_some_and(|hint| hint.contains("5 consecutive checks")));
}

#[tokio::test(start_paused = true)]
async fn feedback_drives_pause_suppression_and_cooldown() {
    let analyzer = ScriptedAnalyzer::new(stuck_analysis());
    let engine = engine_with(analyzer.clone());
    let mut rx = engine.subscribe().await;
    drain(&mut rx);

    let first = "for i in 0..=items.len() { println!(\"{}\", items[i]); }";
    let second = "fn total(items: &[u32]) -> u32 { items.iter().sum() }";

    send(&engine, content(Channel::Code, first)).await;
    assert_eq!(
        engine.run_intervention_tick().await,
        TickOutcome::Intervened(InterventionReason::StuckDetected)
    );
    let events = drain(&mut rx);
    let Some(GhostEvent::Intervention(event)) = events.first() else {
        panic!("expected intervention, got {events:?}");
    };
    assert_eq!(event.message, "Try printing the loop index.");
    assert_eq!(event.priority, Priority::Medium);
    assert_eq!(events.get(1), Some(&GhostEvent::PlantUpdate(PlantUpdate::delta(-15))));

    send(&engine, ControlMessage::Feedback { action: UserAction::NotNow }).await;

    // Analysis is paused right after an intervention.
    send(&engine, content(Channel::Code, second)).await;
    assert_eq!(engine.run_intervention_tick().await, TickOutcome::Skipped);

    tokio::time::advance(Duration::from_secs(9)).await;

    // The dismissed content is still suppressed.
    send(&engine, content(Channel::Code, first)).await;
    assert_eq!(engine.run_intervention_tick().await, TickOutcome::Skipped);

    // Other content is analyzed but the cooldown holds.
    send(&engine, content(Channel::Code, second)).await;
    assert_eq!(
        engine.run_intervention_tick().await,
        TickOutcome::NoIntervention(SuppressReason::Cooldown)
    );
    assert_eq!(analyzer.calls(), 2);

    let status = engine.status().await;
    assert_eq!(
        status.interventions,
        InterventionTotals {
            total: 1,
            accepted: 0,
            ignored: 1
        }
    );

    send(&engine, ControlMessage::Feedback { action: UserAction::ApplyFix }).await;
    let events = drain(&mut rx);
    assert_eq!(
        events,
        vec![
            GhostEvent::PlantUpdate(PlantUpdate::delta(10)),
            GhostEvent::PlantUpdate(PlantUpdate::delta(20)),
        ]
    );
    let status = engine.status().await;
    assert_eq!(status.interventions.accepted, 1);
    assert_eq!(status.interventions.ignored, 0);
}

#[tokio::test(start_paused = true)]
async fn manual_override_switches_state_after_transition() {
    let engine = engine_with(Arc::new(RiskyCommandScreen::new(OfflineAnalyzer)));
    let mut rx = engine.subscribe().await;
    drain(&mut rx);

    let reply = send(&engine, ControlMessage::MockState { state: 3 }).await;
    let Some(Reply::Event(GhostEvent::BiometricUpdate(update))) = reply else {
        panic!("expected biometric_update reply, got {reply:?}");
    };
    assert_eq!(update.source, DataSource::Mock);

    tokio::time::advance(Duration::from_secs(3)).await;
    engine.run_biometric_tick().await;

    let events = drain(&mut rx);
    let Some(GhostEvent::StateChange(change)) = events.first() else {
        panic!("expected state change, got {events:?}");
    };
    assert_eq!(change.to, AffectiveState::Fatigued);
    assert_eq!(change.reason, StateChangeReason::LowRecovery);
    assert!(matches!(
        events.get(1),
        Some(GhostEvent::BiometricUpdate(update)) if update.state == AffectiveState::Fatigued
    ));

    let status = engine.status().await;
    assert!(status.mock_mode);
    assert_eq!(status.state, AffectiveState::Fatigued);
}

#[tokio::test(start_paused = true)]
async fn unknown_preset_is_rejected() {
    let engine = engine_with(Arc::new(OfflineAnalyzer));
    let result = engine.handle_message(ControlMessage::MockState { state: 9 }).await;
    assert!(result.is_err());
    assert_eq!(engine.status().await.state, AffectiveState::Relaxed);
}

#[tokio::test(start_paused = true)]
async fn ble_disconnect_enters_sleep_after_grace_period() {
    let engine = engine_with(Arc::new(OfflineAnalyzer));
    let mut rx = engine.subscribe().await;
    drain(&mut rx);

    send(&engine, ControlMessage::BleDisconnected).await;
    tokio::time::sleep(DISCONNECT_GRACE + Duration::from_secs(1)).await;
    assert_eq!(drain(&mut rx), vec![GhostEvent::SleepMode { active: true }]);
    assert!(engine.status().await.sleep_mode);

    send(&engine, ControlMessage::BleReconnected).await;
    assert_eq!(drain(&mut rx), vec![GhostEvent::SleepMode { active: false }]);
}

#[tokio::test(start_paused = true)]
async fn reconnect_within_grace_period_cancels_sleep() {
    let engine = engine_with(Arc::new(OfflineAnalyzer));
    let mut rx = engine.subscribe().await;
    drain(&mut rx);

    send(&engine, ControlMessage::BleDisconnected).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    send(&engine, ControlMessage::BleReconnected).await;
    tokio::time::sleep(DISCONNECT_GRACE * 2).await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn app_focus_is_broadcast_only_with_an_app() {
    let engine = engine_with(Arc::new(OfflineAnalyzer));
    let mut rx = engine.subscribe().await;
    drain(&mut rx);

    send(&engine, ControlMessage::AppFocus { app_type: None }).await;
    send(&engine, ControlMessage::AppFocus { app_type: Some("browser".into()) }).await;
    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], GhostEvent::AppFocusChange { app_type, .. } if app_type == "browser"));
}

#[tokio::test(start_paused = true)]
async fn status_reply_serializes_with_type_tag() {
    let engine = engine_with(Arc::new(OfflineAnalyzer));
    let reply = send(&engine, ControlMessage::Status).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&reply.to_json().unwrap()).unwrap();
    assert_eq!(value["type"], "status");
    assert_eq!(value["status"]["state"], "RELAXED");
    assert_eq!(value["status"]["policy_status"], "IDLE");

    let reply = send(&engine, ControlMessage::History).await.unwrap();
    assert_eq!(reply, Reply::History(Vec::new()));
}

#[tokio::test(start_paused = true)]
async fn provider_reading_is_authoritative_and_feeds_baseline() {
    let engine = engine_with_provider(ScriptedProvider::serving(rested_reading()));
    let mut rx = engine.subscribe().await;
    drain(&mut rx);

    engine.run_biometric_tick().await;

    let events = drain(&mut rx);
    let [GhostEvent::BiometricUpdate(update)] = events.as_slice() else {
        panic!("expected a single biometric update, got {events:?}");
    };
    assert_eq!(update.source, DataSource::Whoop);
    assert!(update.provider_connected);
    assert_eq!(update.state, AffectiveState::Relaxed);
    assert_eq!(update.recovery, 85);
    // Daily scores carry no live heart rate, so one is walked inside the relaxed band.
    assert!((62..=72).contains(&update.heart_rate), "hr {}", update.heart_rate);

    let status = engine.status().await;
    assert!(!status.mock_mode);
    assert!(status.provider_connected);
    assert_eq!(status.hrv_baseline, 72.0);
}

#[tokio::test(start_paused = true)]
async fn fresh_live_heart_rate_overrides_provider() {
    let engine = engine_with_provider(ScriptedProvider::serving(rested_reading()));
    let mut rx = engine.subscribe().await;
    drain(&mut rx);

    send(&engine, ControlMessage::LiveHr { heart_rate: 120.0 }).await;
    engine.run_biometric_tick().await;

    let events = drain(&mut rx);
    let Some(GhostEvent::StateChange(change)) = events.first() else {
        panic!("expected state change, got {events:?}");
    };
    assert_eq!(change.to, AffectiveState::Stressed);
    let Some(GhostEvent::BiometricUpdate(update)) = events.get(1) else {
        panic!("expected biometric update, got {events:?}");
    };
    assert_eq!(update.source, DataSource::Ble);
    assert_eq!(update.heart_rate, 120);
    assert_eq!(update.estimated_stress, 2.5);

    // Past the freshness window the provider is authoritative again.
    tokio::time::advance(Duration::from_secs(6)).await;
    engine.run_biometric_tick().await;
    let events = drain(&mut rx);
    assert!(events.iter().any(|event| matches!(
        event,
        GhostEvent::BiometricUpdate(update) if update.source == DataSource::Whoop
    )));
}

#[tokio::test(start_paused = true)]
async fn rejected_provider_token_falls_back_to_simulator() {
    let engine = engine_with_provider(ScriptedProvider::expired_for_good());
    assert!(engine.status().await.provider_connected);
    let mut rx = engine.subscribe().await;
    drain(&mut rx);

    engine.run_biometric_tick().await;

    let events = drain(&mut rx);
    let [GhostEvent::BiometricUpdate(update)] = events.as_slice() else {
        panic!("expected a single biometric update, got {events:?}");
    };
    assert_eq!(update.source, DataSource::Mock);
    assert!(!update.provider_connected);

    let status = engine.status().await;
    assert!(status.mock_mode);
    assert!(!status.provider_connected);
    assert_eq!(status.hrv_baseline, 50.0);
}

#[tokio::test(start_paused = true)]
async fn sustained_low_live_heart_rate_enters_and_leaves_sleep() {
    let engine = engine_with(Arc::new(OfflineAnalyzer));
    let mut rx = engine.subscribe().await;
    drain(&mut rx);

    for _ in 0..4 {
        send(&engine, ControlMessage::LiveHr { heart_rate: 45.0 }).await;
        engine.run_biometric_tick().await;
    }
    let events = drain(&mut rx);
    assert!(!events.iter().any(|event| matches!(event, GhostEvent::SleepMode { .. })));

    send(&engine, ControlMessage::LiveHr { heart_rate: 45.0 }).await;
    engine.run_biometric_tick().await;
    let events = drain(&mut rx);
    assert_eq!(events.last(), Some(&GhostEvent::SleepMode { active: true }));
    assert!(engine.status().await.sleep_mode);

    send(&engine, ControlMessage::LiveHr { heart_rate: 70.0 }).await;
    engine.run_biometric_tick().await;
    let events = drain(&mut rx);
    assert_eq!(events.last(), Some(&GhostEvent::SleepMode { active: false }));
    assert!(!engine.status().await.sleep_mode);
}
