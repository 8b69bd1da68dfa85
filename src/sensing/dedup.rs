//! Novelty filters in front of the analysis service. Analysis calls are slow
//! and rate limited; these decide whether an observation is worth one.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::Channel;

use super::phash::compute_hamming_distance;

/// Accepted observations kept for multi-frame analysis.
pub const RECENT_BUFFER: usize = 5;

/// Only this many leading characters take part in the content hash.
pub const CONTENT_HASH_CHARS: usize = 500;
pub const REPEAT_WINDOW: Duration = Duration::from_secs(60);
pub const STUCK_REPEATS: usize = 3;
const CHECK_HISTORY: usize = 20;

#[derive(Debug)]
pub struct ImageChangeDetector {
    threshold: u32,
    last_hash: Option<String>,
    recent: VecDeque<Arc<Vec<u8>>>,
}

impl ImageChangeDetector {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            last_hash: None,
            recent: VecDeque::with_capacity(RECENT_BUFFER),
        }
    }

    /// Novel when there is no previous hash or the distance exceeds the threshold.
    /// The stored hash is replaced either way, so slow drift is never flagged.
    pub fn is_novel(&mut self, phash: String, frame: Arc<Vec<u8>>) -> bool {
        let novel = match self.last_hash.as_deref() {
            None => true,
            Some(previous) => compute_hamming_distance(&phash, previous) > self.threshold,
        };
        self.last_hash = Some(phash);

        if novel {
            self.recent.push_back(frame);
            while self.recent.len() > RECENT_BUFFER {
                self.recent.pop_front();
            }
        }
        novel
    }

    pub fn recent_frames(&self) -> Vec<Arc<Vec<u8>>> {
        self.recent.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentVerdict {
    /// Changed since the last analysis of this channel.
    Novel,
    /// Unchanged for `repeats` checks inside the repeat window. Forwarded once
    /// per streak, annotated as stuck.
    Stuck { repeats: usize },
    Duplicate,
}

impl ContentVerdict {
    pub fn should_analyze(&self) -> bool {
        !matches!(self, ContentVerdict::Duplicate)
    }
}

/// SHA-256 of the first 500 characters, hex encoded.
pub fn content_hash(content: &str) -> String {
    let head: String = content.chars().take(CONTENT_HASH_CHARS).collect();
    hex::encode(Sha256::digest(head.as_bytes()))
}

/// Per-channel repeat tracking. `observe` only records the check; what was
/// actually analyzed is committed with `mark_analyzed` and
/// `mark_stuck_reported` once an analysis has succeeded.
#[derive(Debug, Default)]
pub struct ContentChangeDetector {
    checks: HashMap<Channel, VecDeque<(Instant, String)>>,
    last_analyzed: HashMap<Channel, String>,
    stuck_reported: HashMap<Channel, String>,
}

impl ContentChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, channel: Channel, content: &str, now: Instant) -> (String, ContentVerdict) {
        let hash = content_hash(content);

        let checks = self.checks.entry(channel).or_default();
        checks.push_back((now, hash.clone()));
        while checks.len() > CHECK_HISTORY {
            checks.pop_front();
        }
        let repeats = checks
            .iter()
            .filter(|(at, h)| *h == hash && now.saturating_duration_since(*at) < REPEAT_WINDOW)
            .count();

        let verdict = if repeats >= STUCK_REPEATS {
            if self.stuck_reported.get(&channel) == Some(&hash) {
                ContentVerdict::Duplicate
            } else {
                ContentVerdict::Stuck { repeats }
            }
        } else if self.last_analyzed.get(&channel) == Some(&hash) {
            ContentVerdict::Duplicate
        } else {
            self.stuck_reported.remove(&channel);
            ContentVerdict::Novel
        };
        (hash, verdict)
    }

    pub fn mark_analyzed(&mut self, channel: Channel, hash: String) {
        self.last_analyzed.insert(channel, hash);
    }

    /// The stuck streak for `hash` reached the analysis service; later
    /// repeats are duplicates until the content changes.
    pub fn mark_stuck_reported(&mut self, channel: Channel, hash: String) {
        self.stuck_reported.insert(channel, hash);
    }

    /// Forget what was analyzed so unchanged content can be looked at again.
    pub fn clear_analyzed(&mut self) {
        self.last_analyzed.clear();
    }
}

/// Hint appended to the analysis request for content that stopped changing.
pub fn stuck_hint(repeats: usize) -> String {
    format!(
        "NOTE: The content has not changed for {repeats} consecutive checks (~{}+ seconds). The user may be stuck.",
        repeats * 5
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::phash::{compute_phash, tests as frames};

    #[test]
    fn first_frame_is_novel_and_repeats_are_not() {
        let mut detector = ImageChangeDetector::new(8);
        let bytes = Arc::new(frames::horizontal());
        let hash = compute_phash(&bytes).unwrap();
        assert!(detector.is_novel(hash.clone(), bytes.clone()));
        assert!(!detector.is_novel(hash, bytes));
        assert_eq!(detector.recent_frames().len(), 1);
    }

    #[test]
    fn zero_threshold_flags_any_change() {
        let mut detector = ImageChangeDetector::new(0);
        let a = Arc::new(frames::horizontal());
        let b = Arc::new(frames::vertical());
        assert!(detector.is_novel(compute_phash(&a).unwrap(), a));
        assert!(detector.is_novel(compute_phash(&b).unwrap(), b));
    }

    #[test]
    fn frame_buffer_is_bounded() {
        let mut detector = ImageChangeDetector::new(0);
        for i in 0..8u8 {
            // Unparseable hashes are maximally distant, so every frame is novel.
            detector.is_novel(format!("bogus-{i}"), Arc::new(vec![i]));
        }
        let frames = detector.recent_frames();
        assert_eq!(frames.len(), RECENT_BUFFER);
        assert_eq!(*frames[0], vec![3u8]);
    }

    #[test]
    fn hash_only_covers_first_500_chars() {
        let base = "x".repeat(CONTENT_HASH_CHARS);
        assert_eq!(content_hash(&format!("{base}tail one")), content_hash(&format!("{base}tail two")));
        assert_ne!(content_hash("fn main() {}"), content_hash("fn main() { }"));
    }

    #[test]
    fn unchanged_content_is_forwarded_once_as_stuck() {
        let t0 = Instant::now();
        let mut detector = ContentChangeDetector::new();
        let code = "def broken():\n    return undefined_name";

        let (hash, verdict) = detector.observe(Channel::Code, code, t0);
        assert_eq!(verdict, ContentVerdict::Novel);
        detector.mark_analyzed(Channel::Code, hash);

        let verdicts: Vec<_> = (1..6)
            .map(|i| {
                let (hash, verdict) = detector.observe(Channel::Code, code, t0 + Duration::from_secs(5 * i));
                if let ContentVerdict::Stuck { .. } = verdict {
                    detector.mark_stuck_reported(Channel::Code, hash);
                }
                verdict
            })
            .collect();
        assert_eq!(
            verdicts,
            vec![
                ContentVerdict::Duplicate,
                ContentVerdict::Stuck { repeats: 3 },
                ContentVerdict::Duplicate,
                ContentVerdict::Duplicate,
                ContentVerdict::Duplicate,
            ]
        );
    }

    #[test]
    fn repeats_outside_window_do_not_count() {
        let t0 = Instant::now();
        let mut detector = ContentChangeDetector::new();
        let text = "same notes, nothing new here";
        detector.observe(Channel::Notes, text, t0);
        detector.observe(Channel::Notes, text, t0 + Duration::from_secs(61));
        let (_, verdict) = detector.observe(Channel::Notes, text, t0 + Duration::from_secs(122));
        assert_eq!(verdict, ContentVerdict::Novel);
    }

    #[test]
    fn channels_are_independent() {
        let t0 = Instant::now();
        let mut detector = ContentChangeDetector::new();
        let (hash, _) = detector.observe(Channel::Terminal, "cargo build", t0);
        detector.mark_analyzed(Channel::Terminal, hash);
        let (_, verdict) = detector.observe(Channel::Chat, "cargo build", t0);
        assert_eq!(verdict, ContentVerdict::Novel);
    }

    #[test]
    fn clearing_analyzed_allows_reanalysis() {
        let t0 = Instant::now();
        let mut detector = ContentChangeDetector::new();
        let (hash, _) = detector.observe(Channel::Browser, "rust borrow checker docs", t0);
        detector.mark_analyzed(Channel::Browser, hash);
        detector.clear_analyzed();
        let (_, verdict) = detector.observe(Channel::Browser, "rust borrow checker docs", t0 + Duration::from_secs(70));
        assert_eq!(verdict, ContentVerdict::Novel);
    }

    #[test]
    fn unreported_stuck_streak_stays_stuck() {
        let t0 = Instant::now();
        let mut detector = ContentChangeDetector::new();
        let text = "SELECT * FROM orders WHERE id = ?";
        for i in 0..2 {
            detector.observe(Channel::Notes, text, t0 + Duration::from_secs(5 * i));
        }
        // Never committed, e.g. the analysis was paused or failed.
        let (_, third) = detector.observe(Channel::Notes, text, t0 + Duration::from_secs(10));
        let (hash, fourth) = detector.observe(Channel::Notes, text, t0 + Duration::from_secs(15));
        assert_eq!(third, ContentVerdict::Stuck { repeats: 3 });
        assert_eq!(fourth, ContentVerdict::Stuck { repeats: 4 });

        detector.mark_stuck_reported(Channel::Notes, hash);
        let (_, fifth) = detector.observe(Channel::Notes, text, t0 + Duration::from_secs(20));
        assert_eq!(fifth, ContentVerdict::Duplicate);
    }

    #[test]
    fn stuck_hint_mentions_repeat_count() {
        assert!(stuck_hint(3).contains("3 consecutive checks (~15+ seconds)"));
    }
}
