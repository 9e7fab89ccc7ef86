pub mod action;
pub mod error;
pub mod ids;
pub mod patch;
pub mod timestamp;

pub use action::{Action, ActionKind, Collection, MessageFragment, PendingState};
pub use error::CoreError;
pub use ids::*;
pub use patch::{ActionPatch, Overlay, Patch};
pub use timestamp::{Timestamp, TimestampClock};
