pub mod broadcast;
pub mod inbound;

pub use broadcast::EventHub;
pub use inbound::{ContentUpdate, ControlMessage};
