//! The control loop: shared state, the two periodic ticks, inbound command
//! handling and the start/stop controller.

mod biometric_loop;
mod commands;
mod controller;
mod intervention_loop;
mod shared;
mod status;

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::analysis::{AnalysisService, OfflineAnalyzer, RiskyCommandScreen};
use crate::biometrics::{BiometricSource, ProviderLink};
use crate::context::ContextTracker;
use crate::hub::EventHub;
use crate::models::GhostEvent;
use crate::policy::{InterventionPolicy, MessageGenerator};
use crate::settings::Settings;
use crate::sleep::SleepDetector;

use shared::{BiometricState, SensingState};

pub use commands::Reply;
pub use controller::EngineController;
pub use intervention_loop::TickOutcome;
pub use status::{InterventionTotals, StatusSnapshot};

/// Read the clock through tokio so paused-time tests see a consistent `now`.
pub(crate) fn clock() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// External collaborators plugged into the engine.
pub struct Collaborators {
    pub analyzer: Arc<dyn AnalysisService>,
    pub provider: Option<Arc<dyn BiometricSource>>,
    pub generator: Option<Arc<dyn MessageGenerator>>,
}

impl Collaborators {
    /// No provider, no generator, and the offline analyzer behind the
    /// risky-command screen.
    pub fn offline() -> Self {
        Self {
            analyzer: Arc::new(RiskyCommandScreen::new(OfflineAnalyzer)),
            provider: None,
            generator: None,
        }
    }
}

pub(crate) struct EngineInner {
    settings: Settings,
    hub: EventHub,
    provider: Option<ProviderLink>,
    analyzer: Arc<dyn AnalysisService>,
    generator: Option<Arc<dyn MessageGenerator>>,
    bio: Mutex<BiometricState>,
    sensing: Mutex<SensingState>,
    tracker: Mutex<ContextTracker>,
    policy: Mutex<InterventionPolicy>,
    sleep: Mutex<SleepDetector>,
    sleep_timer: Mutex<Option<JoinHandle<()>>>,
}

/// Cheap to clone; every clone drives the same state.
#[derive(Clone)]
pub struct GhostEngine {
    inner: Arc<EngineInner>,
}

impl GhostEngine {
    pub fn new(settings: Settings, collaborators: Collaborators) -> Self {
        let provider = collaborators.provider.map(|source| {
            ProviderLink::new(source, settings.fetch_timeout(), settings.token_refresh_window())
        });
        Self {
            inner: Arc::new(EngineInner {
                hub: EventHub::new(settings.subscriber_queue),
                sensing: Mutex::new(SensingState::new(settings.phash_threshold)),
                provider,
                analyzer: collaborators.analyzer,
                generator: collaborators.generator,
                bio: Mutex::new(BiometricState::new()),
                tracker: Mutex::new(ContextTracker::new()),
                policy: Mutex::new(InterventionPolicy::new()),
                sleep: Mutex::new(SleepDetector::new()),
                sleep_timer: Mutex::new(None),
                settings,
            }),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn provider_connected(&self) -> bool {
        self.inner
            .provider
            .as_ref()
            .is_some_and(ProviderLink::is_connected)
    }

    /// New subscriber, primed with the current biometric snapshot.
    pub async fn subscribe(&self) -> tokio::sync::mpsc::Receiver<GhostEvent> {
        let snapshot = self.biometric_snapshot(clock()).await;
        self.inner
            .hub
            .subscribe(GhostEvent::BiometricUpdate(snapshot))
            .await
    }

    pub(crate) async fn publish(&self, event: GhostEvent) {
        self.inner.hub.publish(event).await;
    }
}
