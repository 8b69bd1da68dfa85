use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::biometrics::classifier::LIVE_HR_FRESHNESS;
use crate::models::{BiometricUpdate, DataSource, GhostEvent, PlantUpdate};

use super::{clock, GhostEngine};

const ENABLE_LOGS: bool = true;
use crate::{log_debug, log_info, log_warn};

/// Content silence after which the plant starts to wilt.
const INACTIVITY_DECAY_AFTER: Duration = Duration::from_secs(60);
const INACTIVITY_DECAY: i32 = -2;

pub(crate) async fn biometric_loop(engine: GhostEngine, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(engine.settings().biometric_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => engine.run_biometric_tick().await,
            _ = cancel_token.cancelled() => {
                log_info!("biometric loop shutting down");
                break;
            }
        }
    }
}

impl GhostEngine {
    /// One biometric cycle: pick the authoritative source, classify, publish,
    /// then run the sleep detector and the inactivity decay.
    pub async fn run_biometric_tick(&self) {
        let now = clock();
        let override_active = self.inner.bio.lock().await.override_active(now);

        // Provider I/O happens outside every lock.
        let provider_reading = match (&self.inner.provider, override_active) {
            (Some(provider), false) => provider.fetch().await,
            _ => None,
        };
        let provider_connected = self.provider_connected();

        let now = clock();
        let (outcome, update, live, decay) = {
            let mut bio = self.inner.bio.lock().await;
            let live = bio.live_hr.filter(|hr| hr.is_fresh(now, LIVE_HR_FRESHNESS));

            let (mut reading, mut source) = match provider_reading {
                Some(reading) => {
                    bio.classifier.observe_hrv(reading.hrv);
                    (reading, DataSource::Whoop)
                }
                None => (bio.simulator.reading(now), DataSource::Mock),
            };

            if let Some(live) = live {
                reading.heart_rate = live.bpm;
                source = DataSource::Ble;
            } else if source == DataSource::Whoop {
                // Daily scores carry no live heart rate; walk one within the state's band.
                let provisional = bio
                    .classifier
                    .peek(&reading, None, now)
                    .map(|c| c.state)
                    .unwrap_or_default();
                reading.heart_rate = bio.heart_rate.next(provisional, &mut rand::thread_rng());
            }

            let outcome = match bio.classifier.update(&reading, live.as_ref(), now) {
                Ok(outcome) => outcome,
                Err(err) => {
                    log_warn!("[bio] rejected {source:?} reading: {err}");
                    return;
                }
            };
            if source != DataSource::Mock {
                log_debug!(
                    "[bio] classified {} (rec={}, strain={}, hrv={}, hr={}, src={source:?})",
                    outcome.classification.state.as_str(),
                    reading.recovery,
                    reading.strain,
                    reading.hrv,
                    reading.heart_rate
                );
            }

            let update = BiometricUpdate::new(
                &reading,
                outcome.classification.state,
                outcome.classification.stress,
                source,
                provider_connected,
            );
            bio.latest = Some((reading, source));

            let decay = match bio.last_activity {
                Some(last) if now.saturating_duration_since(last) > INACTIVITY_DECAY_AFTER => {
                    bio.last_activity = Some(now);
                    true
                }
                _ => false,
            };
            (outcome, update, bio.live_hr, decay)
        };

        if let Some(change) = outcome.change {
            log_info!(
                "[bio] state {} -> {} ({:?})",
                change.from.as_str(),
                change.to.as_str(),
                change.reason
            );
            self.publish(GhostEvent::StateChange(change)).await;
        }
        self.publish(GhostEvent::BiometricUpdate(update)).await;

        let transition = self.inner.sleep.lock().await.on_cycle(live.as_ref(), now);
        if let Some(state) = transition {
            self.publish(GhostEvent::SleepMode { active: state.is_asleep() }).await;
        }

        if decay {
            self.publish(GhostEvent::PlantUpdate(PlantUpdate::delta(INACTIVITY_DECAY))).await;
        }
    }

    /// Current reading as a `biometric_update`, without classifying anything.
    pub(crate) async fn biometric_snapshot(&self, now: Instant) -> BiometricUpdate {
        let provider_connected = self.provider_connected();
        let bio = self.inner.bio.lock().await;
        let (mut reading, mut source) = bio
            .latest
            .unwrap_or_else(|| (bio.simulator.reading(now), DataSource::Mock));
        if let Some(live) = bio.live_hr.filter(|hr| hr.is_fresh(now, LIVE_HR_FRESHNESS)) {
            reading.heart_rate = live.bpm;
            source = DataSource::Ble;
        }
        let current = bio.classifier.current();
        BiometricUpdate::new(&reading, current.state, current.stress, source, provider_connected)
    }
}
