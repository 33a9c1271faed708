//! Core jukebox logic: queue, roster, disambiguation, command flow.

pub mod disambig;
pub mod forceremove;
pub mod queue;
pub mod roster;

pub use disambig::{Choice, SelectOutcome, SelectRegistry};
pub use forceremove::{ForceRemove, InvokeStyle, Reply, ReplyKind, ResponseSink};
pub use queue::{Track, TrackQueue};
pub use roster::{Member, Roster};
