use std::time::Instant;

use crate::biometrics::{BiometricClassifier, BiometricSimulator, HeartRateSimulator};
use crate::models::{DataSource, LiveHeartRate, Reading};
use crate::sensing::{ContentChangeDetector, ImageChangeDetector, PendingObservations};

/// Everything the biometric tick reads and writes.
#[derive(Debug)]
pub(crate) struct BiometricState {
    pub classifier: BiometricClassifier,
    pub simulator: BiometricSimulator,
    pub heart_rate: HeartRateSimulator,
    pub live_hr: Option<LiveHeartRate>,
    /// The simulator stays authoritative until this instant.
    pub override_until: Option<Instant>,
    pub latest: Option<(Reading, DataSource)>,
    /// Last content update, for the inactivity decay signal.
    pub last_activity: Option<Instant>,
}

impl BiometricState {
    pub fn new() -> Self {
        Self {
            classifier: BiometricClassifier::new(),
            simulator: BiometricSimulator::new(),
            heart_rate: HeartRateSimulator::default(),
            live_hr: None,
            override_until: None,
            latest: None,
            last_activity: None,
        }
    }

    pub fn override_active(&self, now: Instant) -> bool {
        self.override_until.is_some_and(|until| now < until)
    }
}

/// Pending observations and the two novelty filters in front of analysis.
#[derive(Debug)]
pub(crate) struct SensingState {
    pub pending: PendingObservations,
    pub content: ContentChangeDetector,
    pub image: ImageChangeDetector,
}

impl SensingState {
    pub fn new(phash_threshold: u32) -> Self {
        Self {
            pending: PendingObservations::new(),
            content: ContentChangeDetector::new(),
            image: ImageChangeDetector::new(phash_threshold),
        }
    }
}
