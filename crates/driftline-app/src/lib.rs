//! Application layer for Driftline
//!
//! Pure state machines and generic runtime for chat orchestration, enabling
//! deterministic simulation testing with the same code that runs in
//! production.
//!
//! # Components
//!
//! - [`App`]: chat state machine (timeline, viewport, search, typing)
//! - [`ViewportController`]: scroll tracking, unread badge, anchor restore
//! - [`SearchIndex`]: in-window search with a movable cursor
//! - [`Driver`]: trait for platform-specific rendering and transport
//! - [`Runtime`]: generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod driver;
mod event;
mod runtime;
mod search;
mod viewport;

pub use action::{AppAction, ConnectionState, ScrollCommand};
pub use app::App;
pub use driver::Driver;
pub use event::AppEvent;
pub use runtime::Runtime;
pub use search::SearchIndex;
pub use viewport::{ScrollMetrics, ScrollPosition, ViewportAction, ViewportController};
