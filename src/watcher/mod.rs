//! Debounced watch-and-push engine
//!
//! Implements the `watch` command with:
//! - One explicit watch per non-ignored directory, re-registered as
//!   directories appear
//! - Debouncing: a batch is pushed only after `sync_delay` of quiet
//! - Push failures logged, never fatal
//! - Clean cancellation reported as [`WatchOutcome::Cancelled`]
//!
//! ## Architecture
//!
//! Two flows share one [`PendingChangeSet`] behind a mutex:
//! - the observer thread drains `notify` events and the cancel signal
//! - the coordinator (the caller's thread) ticks, waits for the change set
//!   to settle and hands batches to a [`Pusher`](crate::push::Pusher)
//!
//! Every failure of the observer is parked in the change set, so the
//! coordinator is the only place a session ends.
//!
//! ## Usage
//!
//! ```ignore
//! let (cancel, signal) = cancel_pair();
//! let session = WatchSession::new("/src/app", signal).with_sync_delay(delay);
//! run_watch(session, &pusher, &mut std::io::stdout())?;
//! ```

mod engine;
mod event;
mod matcher;
mod observer;
mod registrar;
mod session;
mod state;


pub use engine::{run_watch, WatchEngine, WatchOutcome, WatchSummary, MAX_TICK, MIN_TICK};
pub use event::{OutputFormat, WatchEvent};
pub use matcher::IgnoreMatcher;
pub use session::{cancel_pair, CancelHandle, CancelSignal, WatchSession, DEFAULT_SYNC_DELAY};
pub use state::{ChangeBatch, PendingChangeSet};
