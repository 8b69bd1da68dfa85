pub mod offline;
pub mod risky;
pub mod service;

pub use offline::OfflineAnalyzer;
pub use risky::{detect_risky_command, RiskyCommandScreen};
pub use service::{analyze_with_timeout, AnalysisRequest, AnalysisService};
