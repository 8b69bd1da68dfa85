pub mod tracker;

pub use tracker::{ContextEntry, ContextTracker, SessionStats, StressStats};
