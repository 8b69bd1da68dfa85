use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc, time::Instant};

/// Where an observation came from. Text channels mirror the client's app
/// windows; `Screen` carries raw frames.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    #[default]
    Code,
    Terminal,
    Browser,
    Notes,
    Chat,
    Screen,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Code => "code",
            Channel::Terminal => "terminal",
            Channel::Browser => "browser",
            Channel::Notes => "notes",
            Channel::Chat => "chat",
            Channel::Screen => "screen",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    /// Encoded image bytes (PNG/JPEG).
    Frame(Arc<Vec<u8>>),
}

impl Payload {
    /// Characters for text, bytes for frames.
    pub fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.chars().count(),
            Payload::Frame(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A raw observation waiting for the intervention tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub channel: Channel,
    pub payload: Payload,
    /// Optional client hints (language, cursor line, url, shell, platform).
    pub metadata: BTreeMap<String, String>,
    pub received_at: Instant,
}

impl Observation {
    pub fn text(channel: Channel, content: impl Into<String>, received_at: Instant) -> Self {
        Self {
            channel,
            payload: Payload::Text(content.into()),
            metadata: BTreeMap::new(),
            received_at,
        }
    }

    pub fn frame(bytes: Vec<u8>, received_at: Instant) -> Self {
        Self {
            channel: Channel::Screen,
            payload: Payload::Frame(Arc::new(bytes)),
            metadata: BTreeMap::new(),
            received_at,
        }
    }
}
