//! Podsync - push a component's source changes into its running container
//!
//! Podsync watches a component's source tree, waits for edits to settle, then
//! hands each batch of changed and deleted paths to a [`push::Pusher`]. The
//! watch engine lives in [`watcher`]; the `oc`-backed pusher in [`push`].

pub mod config;
pub mod error;
pub mod ignores;
pub mod push;
pub mod watcher;

// Re-exports for convenience
pub use config::Config;
pub use error::{PodsyncError, PodsyncResult};
pub use push::{OcPusher, PushError, PushRequest, Pusher};
pub use watcher::{
    cancel_pair, run_watch, CancelHandle, OutputFormat, WatchEngine, WatchEvent, WatchOutcome,
    WatchSession, WatchSummary,
};
