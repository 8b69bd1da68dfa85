pub mod analysis;
pub mod biometrics;
pub mod context;
pub mod engine;
pub mod error;
pub mod hub;
pub mod models;
pub mod policy;
pub mod sensing;
pub mod settings;
pub mod sleep;
pub mod utils;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use engine::{Collaborators, EngineController, GhostEngine};
use hub::ControlMessage;
use settings::{Settings, SettingsStore};

const ENABLE_LOGS: bool = true;

const DEFAULT_SETTINGS_PATH: &str = "ghost-settings.json";
const OUTPUT_QUEUE: usize = 64;

pub fn run() -> Result<()> {
    let path = std::env::var("GHOST_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_PATH));
    let settings = SettingsStore::load(&path)?;

    // Initialize logging (reads RUST_LOG env var)
    let level = if settings.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(serve(settings))
}

/// JSON lines in on stdin, JSON lines out on stdout, until stdin closes.
async fn serve(settings: Settings) -> Result<()> {
    let engine = GhostEngine::new(settings, Collaborators::offline());
    let mut controller = EngineController::new();
    controller.start(&engine)?;

    let (out_tx, mut out_rx) = mpsc::channel::<String>(OUTPUT_QUEUE);
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = out_rx.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut events = engine.subscribe().await;
    let event_tx = out_tx.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => {
                    if event_tx.send(line).await.is_err() {
                        break;
                    }
                }
                Err(err) => log_error!("failed to serialize {} event: {err}", event.kind()),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let message: ControlMessage = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(err) => {
                log_warn!("ignoring malformed control message: {err}");
                continue;
            }
        };
        match engine.handle_message(message).await {
            Ok(Some(reply)) => {
                if out_tx.send(reply.to_json()?).await.is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => log_warn!("control message rejected: {err:#}"),
        }
    }

    log_info!("stdin closed, shutting down");
    controller.stop(&engine).await?;
    forwarder.abort();
    let _ = forwarder.await;
    drop(out_tx);
    writer
        .await
        .context("stdout writer failed to join")?
        .context("failed to write to stdout")
}
