//! Telegram integration.

pub mod client;
pub mod sinks;

pub use client::{run_telegram_daemon, JukeboxState};
pub use sinks::{DeferredSink, DirectSink};
