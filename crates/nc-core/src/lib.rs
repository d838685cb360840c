//! NoCookie Core Library
//!
//! This crate holds everything the NoCookie extension decides: which URLs
//! are videos, what their no-cookie form is, when a page should be checked,
//! and the small amount of state (an on/off flag and redirect counters) that
//! survives between navigations.
//!
//! # Architecture
//!
//! Browser APIs are reached only through the traits in `platform` and the
//! `KeyValueStore` in `storage`, so the same code runs behind the wasm
//! bindings, in the CLI, and against in-memory fakes in tests.
//!
//! # Modules
//!
//! - `url`: URL classification and no-cookie rewriting
//! - `monitor`: In-page navigation state machine and its tokio driver
//! - `background`: Popup messages, install/startup hooks, pre-navigation hook
//! - `gate`: Persisted enablement flag
//! - `stats`: Daily/total redirect counters
//! - `storage`: Key-value store seam
//! - `platform`: Browser effect traits
//! - `types`: Shared type definitions

pub mod background;
pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod message;
pub mod monitor;
pub mod platform;
pub mod stats;
pub mod storage;
pub mod types;
pub mod url;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use background::{Background, NavigationOutcome};
pub use error::{Error, PlatformError, StorageError};
pub use gate::EnablementGate;
pub use monitor::{MonitorMachine, MonitorState};
pub use stats::StatsAggregator;
pub use types::{NavigationEvent, RedirectStats, UrlClassification};
pub use url::{classify, is_video_url, rewrite_url};
