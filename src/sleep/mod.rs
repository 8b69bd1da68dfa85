pub mod detector;

pub use detector::{SleepDetector, SleepState, DISCONNECT_GRACE};
