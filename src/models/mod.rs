pub mod analysis;
pub mod event;
pub mod observation;
pub mod reading;
pub mod state;

pub use analysis::{AnalysisResult, SuggestedIntervention};
pub use event::{
    BiometricUpdate, DataSource, GhostEvent, InterventionEvent, InterventionReason, PlantUpdate,
    Priority, StateChange, StateChangeReason, UserAction,
};
pub use observation::{Channel, Observation, Payload};
pub use reading::{LiveHeartRate, Reading};
pub use state::{AffectiveState, Classification, PersonalityModifiers, Verbosity};
