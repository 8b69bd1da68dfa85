//! Control messages sent by clients, one JSON object per message.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::time::Instant;

use crate::error::GhostError;
use crate::models::{Channel, Observation, UserAction};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    Feedback {
        action: UserAction,
    },
    ContentUpdate(ContentUpdate),
    /// Manual override to simulator preset 1-5.
    MockState {
        state: u8,
    },
    LiveHr {
        heart_rate: f64,
    },
    BleDisconnected,
    BleReconnected,
    AppFocus {
        #[serde(default)]
        app_type: Option<String>,
    },
    /// Ask for a status snapshot.
    Status,
    /// Ask for the recent intervention history.
    History,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContentUpdate {
    pub app_type: Channel,
    pub content: String,
    pub language: Option<String>,
    pub cursor_line: Option<u64>,
    pub url: Option<String>,
    pub shell: Option<String>,
    pub platform: Option<String>,
    /// Base64-encoded screen frame. When present the update is an image
    /// observation and `content` is ignored.
    pub frame: Option<String>,
}

impl ContentUpdate {
    pub fn into_observation(self, received_at: Instant) -> Result<Observation, GhostError> {
        if let Some(encoded) = self.frame {
            let bytes = STANDARD
                .decode(encoded.as_bytes())
                .map_err(|err| GhostError::Image(format!("invalid base64 frame: {err}")))?;
            return Ok(Observation::frame(bytes, received_at));
        }

        let mut observation = Observation::text(self.app_type, self.content, received_at);
        let hints = [
            ("language", self.language),
            ("cursor_line", self.cursor_line.map(|line| line.to_string())),
            ("url", self.url),
            ("shell", self.shell),
            ("platform", self.platform),
        ];
        for (key, value) in hints {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                observation.metadata.insert(key.to_string(), value);
            }
        }
        Ok(observation)
    }
}
