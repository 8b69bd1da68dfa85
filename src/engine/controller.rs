use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::biometric_loop::biometric_loop;
use super::intervention_loop::intervention_loop;
use super::GhostEngine;

const ENABLE_LOGS: bool = true;
use crate::log_info;

/// Owns the two periodic tasks. Both stop at the next loop iteration once
/// the shared token is cancelled.
#[derive(Default)]
pub struct EngineController {
    handles: Vec<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl EngineController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.cancel_token.is_some()
    }

    pub fn start(&mut self, engine: &GhostEngine) -> Result<()> {
        if self.is_running() {
            bail!("engine already running");
        }

        let cancel_token = CancellationToken::new();
        self.handles = vec![
            tokio::spawn(biometric_loop(engine.clone(), cancel_token.clone())),
            tokio::spawn(intervention_loop(engine.clone(), cancel_token.clone())),
        ];
        self.cancel_token = Some(cancel_token);
        log_info!("engine started");
        Ok(())
    }

    pub async fn stop(&mut self, engine: &GhostEngine) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        for handle in self.handles.drain(..) {
            handle.await.context("engine loop task failed to join")?;
        }
        engine.cancel_sleep_timer().await;
        Ok(())
    }
}
