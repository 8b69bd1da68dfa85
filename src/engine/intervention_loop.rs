use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::analysis::{analyze_with_timeout, AnalysisRequest};
use crate::models::{
    Channel, GhostEvent, InterventionReason, Observation, Payload, PlantUpdate, Priority,
};
use crate::policy::{compose, generate_message, Decision, SuppressReason};
use crate::sensing::{compute_phash, stuck_hint, ContentVerdict};
use crate::utils::logging::preview;

use super::{clock, GhostEngine};

const ENABLE_LOGS: bool = true;
use crate::{log_debug, log_error, log_info, log_warn};

const NO_INTERVENTION_REWARD: i32 = 10;
const CRITICAL_PENALTY: i32 = -25;
const INTERVENTION_PENALTY: i32 = -15;
const LOG_PREVIEW_CHARS: usize = 80;

/// What one intervention tick did. Returned for observability and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing pending that is long enough to analyze.
    Idle,
    /// Unchanged, suppressed, or analysis is paused.
    Skipped,
    AnalysisFailed,
    NoIntervention(SuppressReason),
    Intervened(InterventionReason),
}

pub(crate) async fn intervention_loop(engine: GhostEngine, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(engine.settings().intervention_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = engine.run_intervention_tick().await;
                if outcome != TickOutcome::Idle {
                    log_debug!("intervention tick: {outcome:?}");
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("intervention loop shutting down");
                break;
            }
        }
    }
}

/// A pending observation that passed the novelty filters.
struct Accepted {
    request: AnalysisRequest,
    content_hash: Option<String>,
    stuck: bool,
}

impl GhostEngine {
    /// One intervention cycle over the freshest pending observation.
    pub async fn run_intervention_tick(&self) -> TickOutcome {
        let min_len = self.inner.settings.content_min_length;
        let Some(observation) = self.inner.sensing.lock().await.pending.take_latest(min_len) else {
            return TickOutcome::Idle;
        };
        let channel = observation.channel;

        let accepted = match self.screen(observation).await {
            Ok(Some(accepted)) => accepted,
            Ok(None) => return TickOutcome::Skipped,
            Err(err) => {
                log_warn!("[ghost] {} observation dropped: {err:#}", channel.as_str());
                return TickOutcome::Skipped;
            }
        };

        let timeout = self.inner.settings.analysis_timeout();
        let analysis = match analyze_with_timeout(self.inner.analyzer.as_ref(), &accepted.request, timeout).await {
            Ok(analysis) => analysis,
            Err(err) if err.is_transient() => {
                log_warn!("[ghost] {} analysis unavailable: {err}", channel.as_str());
                return TickOutcome::AnalysisFailed;
            }
            Err(err) => {
                log_error!("[ghost] {} analysis failed: {err}", channel.as_str());
                return TickOutcome::AnalysisFailed;
            }
        };
        if let Some(hash) = &accepted.content_hash {
            let mut sensing = self.inner.sensing.lock().await;
            sensing.content.mark_analyzed(channel, hash.clone());
            if accepted.stuck {
                sensing.content.mark_stuck_reported(channel, hash.clone());
            }
        }

        let now = clock();
        let (classification, hrv_baseline) = {
            let bio = self.inner.bio.lock().await;
            (bio.classifier.current(), bio.classifier.baseline())
        };
        self.inner
            .tracker
            .lock()
            .await
            .record(&analysis, classification.state, classification.stress, now);

        let (decision, prompt) = {
            let mut policy = self.inner.policy.lock().await;
            let decision = policy.evaluate(&analysis, classification, now);
            let prompt = match decision {
                Decision::Intervene(reason) if !reason.is_instant() => {
                    Some(policy.prompt(&analysis, classification, hrv_baseline))
                }
                _ => None,
            };
            (decision, prompt)
        };

        let reason = match decision {
            Decision::Intervene(reason) => reason,
            Decision::Suppress(why) => {
                self.publish(GhostEvent::PlantUpdate(PlantUpdate::delta(NO_INTERVENTION_REWARD))).await;
                return TickOutcome::NoIntervention(why);
            }
        };

        let state = classification.state;
        let message = match compose::instant_message(reason, &analysis, classification.stress, hrv_baseline) {
            Some(message) => message,
            None => {
                let generated = match (&self.inner.generator, &prompt) {
                    (Some(generator), Some(prompt)) => generate_message(generator.as_ref(), prompt, timeout).await,
                    _ => None,
                };
                compose::resolve_message(generated, &analysis, state, &mut rand::thread_rng())
            }
        };

        let now = clock();
        let mut event = compose::build_event(reason, state, &analysis, message, Utc::now());
        event.app_type = Some(channel);
        event.biometric = Some(self.biometric_snapshot(now).await);

        self.inner.policy.lock().await.commit(
            event.clone(),
            accepted.content_hash,
            self.inner.settings.post_intervention_pause(),
            now,
        );
        self.inner.sensing.lock().await.content.clear_analyzed();

        log_info!(
            "[ghost] ({}/{}) {}",
            state.as_str(),
            channel.as_str(),
            preview(&event.message, LOG_PREVIEW_CHARS)
        );
        let penalty = if event.priority == Priority::Critical {
            CRITICAL_PENALTY
        } else {
            INTERVENTION_PENALTY
        };
        self.publish(GhostEvent::Intervention(Box::new(event))).await;
        self.publish(GhostEvent::PlantUpdate(PlantUpdate::delta(penalty))).await;
        TickOutcome::Intervened(reason)
    }

    /// Run the novelty filters and the pause/suppression checks. `Ok(None)`
    /// means the observation is not worth an analysis call.
    async fn screen(&self, observation: Observation) -> anyhow::Result<Option<Accepted>> {
        let now = clock();
        let channel = observation.channel;
        let context_summary = self.inner.tracker.lock().await.summary();

        match observation.payload {
            Payload::Text(text) => {
                let (hash, verdict) = self.inner.sensing.lock().await.content.observe(channel, &text, now);
                if !verdict.should_analyze() || self.inner.policy.lock().await.analysis_blocked(&hash, now) {
                    return Ok(None);
                }
                let stuck_hint = match verdict {
                    ContentVerdict::Stuck { repeats } => {
                        log_info!("[ghost] {} unchanged for {repeats} checks", channel.as_str());
                        Some(stuck_hint(repeats))
                    }
                    _ => None,
                };
                let stuck = stuck_hint.is_some();
                Ok(Some(Accepted {
                    request: AnalysisRequest {
                        channel,
                        text: Some(text),
                        frames: Vec::new(),
                        context_summary,
                        metadata: observation.metadata,
                        stuck_hint,
                    },
                    content_hash: Some(hash),
                    stuck,
                }))
            }
            Payload::Frame(bytes) => {
                let phash = tokio::task::spawn_blocking({
                    let bytes = Arc::clone(&bytes);
                    move || compute_phash(&bytes)
                })
                .await
                .context("phash worker join failed")??;

                let frames = {
                    let mut sensing = self.inner.sensing.lock().await;
                    if !sensing.image.is_novel(phash, bytes) {
                        return Ok(None);
                    }
                    sensing.image.recent_frames()
                };
                if self.inner.policy.lock().await.state().analysis_paused(now) {
                    return Ok(None);
                }
                Ok(Some(Accepted {
                    request: AnalysisRequest {
                        channel: Channel::Screen,
                        text: None,
                        frames,
                        context_summary,
                        metadata: observation.metadata,
                        stuck_hint: None,
                    },
                    content_hash: None,
                    stuck: false,
                }))
            }
        }
    }
}
