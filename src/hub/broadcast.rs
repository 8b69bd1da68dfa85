use tokio::sync::{mpsc, Mutex};

use crate::models::GhostEvent;

const ENABLE_LOGS: bool = true;
use crate::log_info;

/// Best-effort fan-out to connected clients. A subscriber whose queue is full
/// or whose receiver is gone is dropped on the first failed send.
pub struct EventHub {
    subscribers: Mutex<Vec<mpsc::Sender<GhostEvent>>>,
    queue: usize,
}

impl EventHub {
    pub fn new(queue: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            queue: queue.max(1),
        }
    }

    /// Register a subscriber; `snapshot` is the first event it receives.
    pub async fn subscribe(&self, snapshot: GhostEvent) -> mpsc::Receiver<GhostEvent> {
        let (tx, rx) = mpsc::channel(self.queue);
        // Fresh channel with capacity >= 1, so this cannot fail.
        let _ = tx.try_send(snapshot);
        let mut subscribers = self.subscribers.lock().await;
        subscribers.push(tx);
        log_info!("[hub] client connected ({} total)", subscribers.len());
        rx
    }

    /// Returns how many subscribers received the event.
    pub async fn publish(&self, event: GhostEvent) -> usize {
        let mut subscribers = self.subscribers.lock().await;
        let before = subscribers.len();
        subscribers.retain(|tx| tx.try_send(event.clone()).is_ok());
        if subscribers.len() < before {
            log_info!(
                "[hub] dropped {} unresponsive client(s) ({} total)",
                before - subscribers.len(),
                subscribers.len()
            );
        }
        subscribers.len()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }
}
