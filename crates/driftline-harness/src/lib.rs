//! Deterministic test harness for Driftline
//!
//! A virtual-clock [`SimEnv`], scripted history fixtures, and message
//! builders so the timeline and app state machines can be tested without
//! real time or network.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builders;
mod scripted;
mod sim_env;

pub use builders::IncomingBuilder;
pub use scripted::ScriptedHistory;
pub use sim_env::{SimEnv, SimInstant};
