use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

/// Tunables for the control loop. Every field has a default so a partial
/// settings file only needs to name what it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub biometric_interval_secs: u64,
    pub intervention_interval_secs: u64,
    pub analysis_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    /// Text observations shorter than this are left pending.
    pub content_min_length: usize,
    /// Hamming distance above which a screen frame counts as changed.
    pub phash_threshold: u32,
    pub mock_override_secs: u64,
    /// Analysis pause after an intervention is published.
    pub post_intervention_pause_secs: u64,
    pub feedback_suppression_secs: u64,
    pub token_refresh_window_secs: u64,
    pub subscriber_queue: usize,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            biometric_interval_secs: 5,
            intervention_interval_secs: 1,
            analysis_timeout_secs: 15,
            fetch_timeout_secs: 10,
            content_min_length: 20,
            phash_threshold: 8,
            mock_override_secs: 30,
            post_intervention_pause_secs: 8,
            feedback_suppression_secs: 10,
            token_refresh_window_secs: 60,
            subscriber_queue: 64,
            debug: false,
        }
    }
}

impl Settings {
    pub fn biometric_interval(&self) -> Duration {
        Duration::from_secs(self.biometric_interval_secs.max(1))
    }

    pub fn intervention_interval(&self) -> Duration {
        Duration::from_secs(self.intervention_interval_secs.max(1))
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn mock_override(&self) -> Duration {
        Duration::from_secs(self.mock_override_secs)
    }

    pub fn post_intervention_pause(&self) -> Duration {
        Duration::from_secs(self.post_intervention_pause_secs)
    }

    pub fn feedback_suppression(&self) -> Duration {
        Duration::from_secs(self.feedback_suppression_secs)
    }

    pub fn token_refresh_window(&self) -> Duration {
        Duration::from_secs(self.token_refresh_window_secs)
    }
}

pub struct SettingsStore;

impl SettingsStore {
    /// Read settings from `path` (defaults when the file does not exist),
    /// then apply `GHOST_*` environment overrides.
    pub fn load(path: &Path) -> Result<Settings> {
        let mut settings = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Malformed settings file {}", path.display()))?
        } else {
            Settings::default()
        };

        apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
        Ok(settings)
    }
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(value) = lookup("GHOST_DEBUG") {
        settings.debug = value == "1" || value.eq_ignore_ascii_case("true");
    }
    if let Some(secs) = lookup("GHOST_BIOMETRIC_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
        settings.biometric_interval_secs = secs;
    }
    if let Some(secs) = lookup("GHOST_ANALYSIS_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.analysis_timeout_secs = secs;
    }
}
