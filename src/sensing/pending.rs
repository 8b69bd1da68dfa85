use std::collections::HashMap;

use crate::models::{Channel, Observation, Payload};

/// Observations that arrived between intervention ticks. Last write wins per
/// channel, so a burst of keystrokes collapses into one analysis.
#[derive(Debug, Default)]
pub struct PendingObservations {
    entries: HashMap<Channel, Observation>,
}

impl PendingObservations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, observation: Observation) {
        self.entries.insert(observation.channel, observation);
    }

    /// Remove and return the most recent observation that is substantial
    /// enough to analyze. Text must reach `min_text_len` characters; frames
    /// only need to be non-empty. Shorter entries stay pending.
    pub fn take_latest(&mut self, min_text_len: usize) -> Option<Observation> {
        let channel = self
            .entries
            .values()
            .filter(|obs| match &obs.payload {
                Payload::Text(text) => text.chars().count() >= min_text_len,
                Payload::Frame(bytes) => !bytes.is_empty(),
            })
            .max_by_key(|obs| obs.received_at)
            .map(|obs| obs.channel)?;
        self.entries.remove(&channel)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
