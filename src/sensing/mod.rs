pub mod dedup;
pub mod pending;
pub mod phash;

pub use dedup::{content_hash, stuck_hint, ContentChangeDetector, ContentVerdict, ImageChangeDetector};
pub use pending::PendingObservations;
pub use phash::{compute_hamming_distance, compute_phash};
