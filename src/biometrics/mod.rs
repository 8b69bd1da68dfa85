pub mod baseline;
pub mod classifier;
pub mod simulator;
pub mod source;

pub use baseline::BaselineTracker;
pub use classifier::{classify, BiometricClassifier, ClassifyOutcome};
pub use simulator::{BiometricSimulator, HeartRateSimulator};
pub use source::{BiometricSource, ProviderLink};
