//! Watch engine: setup, debounce coordinator and push dispatch

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{tick, unbounded};

use crate::error::{PodsyncError, PodsyncResult};
use crate::push::{PushRequest, Pusher};

use super::event::{OutputFormat, Reporter, WatchEvent};
use super::matcher::IgnoreMatcher;
use super::observer::Observer;
use super::registrar::register_recursive;
use super::session::WatchSession;
use super::state::{lock, ChangeBatch, PendingChangeSet};

/// Shortest coordinator tick, so a zero delay does not spin
pub const MIN_TICK: Duration = Duration::from_millis(10);
/// Longest coordinator tick, so long delays still settle promptly
pub const MAX_TICK: Duration = Duration::from_millis(100);

/// How a session that did not fail came to an end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The cancel signal was raised
    Cancelled(WatchSummary),
}

/// Push counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub pushes: usize,
    pub failed_pushes: usize,
}

/// What the coordinator decided on one tick
enum Tick {
    Terminate(PodsyncError),
    Idle,
    Accumulating,
    Dispatch(ChangeBatch),
}

/// Runs one watch session
#[derive(Debug)]
pub struct WatchEngine {
    session: WatchSession,
    reporter: Reporter,
}

impl WatchEngine {
    pub fn new(session: WatchSession) -> Self {
        Self {
            session,
            reporter: Reporter::default(),
        }
    }

    /// Set the progress output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.reporter.format = format;
        self
    }

    /// Prefix text progress lines with the local time
    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.reporter.timestamps = timestamps;
        self
    }

    /// Watch until cancelled or a fatal error occurs (blocking).
    ///
    /// Cancellation is reported as `Ok(WatchOutcome::Cancelled)`; every
    /// `Err` is a real failure.
    pub fn run(self, pusher: &dyn Pusher, out: &mut dyn Write) -> PodsyncResult<WatchOutcome> {
        let WatchEngine { session, reporter } = self;
        let WatchSession {
            component_name,
            application_name,
            root,
            ignore_patterns,
            sync_delay,
            ready,
            cancel,
        } = session;

        let matcher = IgnoreMatcher::new(&ignore_patterns)?;

        let (tx, rx) = unbounded();
        let mut watcher = notify::recommended_watcher(
            move |res: notify::Result<notify::Event>| {
                let _ = tx.send(res);
            },
        )
        .map_err(|e| PodsyncError::from_notify(&root, e))?;

        // Files already present are not pending changes
        let watched = register_recursive(&mut watcher, &root, &matcher, |_| {})?;
        let root_is_file = fs::metadata(&root).map(|m| m.is_file()).unwrap_or(false);
        tracing::info!(
            root = %root.display(),
            watched,
            ignores = matcher.len(),
            pusher = pusher.name(),
            "watch started"
        );
        reporter.emit(
            out,
            &WatchEvent::WatchStarted {
                root: root.display().to_string(),
                watched,
            },
        );

        let state = Arc::new(Mutex::new(PendingChangeSet::new()));
        let observer = Observer::new(root.clone(), watcher, matcher, Arc::clone(&state));
        let observer = thread::Builder::new()
            .name("podsync-observer".to_string())
            .spawn(move || observer.run(rx, cancel))?;

        if let Some(ready) = ready {
            let _ = ready.send(());
        }

        let coordinator = Coordinator {
            root: &root,
            root_is_file,
            delay: sync_delay,
            component: &component_name,
            application: &application_name,
            reporter,
        };
        let result = coordinator.run(&state, &observer, pusher, out);

        if observer.join().is_err() {
            tracing::error!("observer thread panicked");
        }

        let summary = result?;
        tracing::info!(
            pushes = summary.pushes,
            failed = summary.failed_pushes,
            "watch stopped"
        );
        reporter.emit(out, &WatchEvent::Shutdown);
        Ok(WatchOutcome::Cancelled(summary))
    }
}

/// Debounce loop: decides on every tick whether pending changes are settled
struct Coordinator<'a> {
    root: &'a Path,
    root_is_file: bool,
    delay: Duration,
    component: &'a str,
    application: &'a str,
    reporter: Reporter,
}

impl Coordinator<'_> {
    /// Returns the summary on cancellation, the sticky error otherwise
    fn run(
        &self,
        state: &Mutex<PendingChangeSet>,
        observer: &JoinHandle<()>,
        pusher: &dyn Pusher,
        out: &mut dyn Write,
    ) -> PodsyncResult<WatchSummary> {
        let ticker = tick(self.delay.clamp(MIN_TICK, MAX_TICK));
        let mut summary = WatchSummary::default();
        let mut announced = false;

        loop {
            ticker
                .recv()
                .map_err(|_| PodsyncError::EventSourceClosed)?;

            let step = {
                let mut pending = lock(state);
                if let Some(err) = pending.take_failure() {
                    Tick::Terminate(err)
                } else if observer.is_finished() {
                    Tick::Terminate(PodsyncError::EventSourceClosed)
                } else if !pending.is_dirty() {
                    Tick::Idle
                } else if !pending.is_settled(self.delay, Instant::now()) {
                    Tick::Accumulating
                } else {
                    Tick::Dispatch(pending.take_batch())
                }
            };

            match step {
                Tick::Terminate(PodsyncError::Cancelled) => return Ok(summary),
                Tick::Terminate(err) => return Err(err),
                Tick::Idle if !announced => {
                    announced = true;
                    self.reporter.emit(
                        out,
                        &WatchEvent::Waiting {
                            root: self.root.display().to_string(),
                        },
                    );
                }
                Tick::Idle | Tick::Accumulating => {}
                Tick::Dispatch(batch) => {
                    announced = false;
                    if batch.is_empty() {
                        continue;
                    }
                    let batch = self.resolve_root(batch);
                    self.dispatch(&batch, pusher, out, &mut summary);
                }
            }
        }
    }

    /// Apply the single-file root policy to a batch
    fn resolve_root(&self, batch: ChangeBatch) -> ResolvedBatch {
        let root = self.root;
        if !self.root_is_file {
            return ResolvedBatch {
                sync_root: root.to_path_buf(),
                changed: batch.changed,
                deleted: batch.deleted,
            };
        }

        let others = batch
            .changed
            .iter()
            .chain(&batch.deleted)
            .filter(|p| p.as_path() != root)
            .count();
        if others > 0 {
            tracing::warn!(
                root = %root.display(),
                others,
                "changes other than the watched file were dropped"
            );
        }

        let sync_root = root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf());
        if root.exists() {
            ResolvedBatch {
                sync_root,
                changed: vec![root.to_path_buf()],
                deleted: Vec::new(),
            }
        } else {
            ResolvedBatch {
                sync_root,
                changed: Vec::new(),
                deleted: vec![root.to_path_buf()],
            }
        }
    }

    fn dispatch(
        &self,
        batch: &ResolvedBatch,
        pusher: &dyn Pusher,
        out: &mut dyn Write,
        summary: &mut WatchSummary,
    ) {
        for path in &batch.changed {
            self.reporter.emit(
                out,
                &WatchEvent::FileChanged {
                    path: path.display().to_string(),
                },
            );
        }
        for path in &batch.deleted {
            self.reporter.emit(
                out,
                &WatchEvent::FileDeleted {
                    path: path.display().to_string(),
                },
            );
        }
        self.reporter.emit(
            out,
            &WatchEvent::PushStarted {
                changed: batch.changed.len(),
                deleted: batch.deleted.len(),
            },
        );

        let request = PushRequest {
            component: self.component,
            application: self.application,
            sync_root: &batch.sync_root,
            changed: &batch.changed,
            deleted: &batch.deleted,
        };

        // Tool output would corrupt the NDJSON stream
        let mut sink = io::sink();
        let push_out: &mut dyn Write = match self.reporter.format {
            OutputFormat::Json => &mut sink,
            OutputFormat::Text => &mut *out,
        };

        match pusher.push(&request, push_out) {
            Ok(()) => {
                summary.pushes += 1;
                self.reporter.emit(out, &WatchEvent::PushComplete);
            }
            Err(err) => {
                summary.failed_pushes += 1;
                tracing::warn!(error = %err, "push failed; waiting for the next change");
                self.reporter.emit(
                    out,
                    &WatchEvent::PushFailed {
                        message: err.to_string(),
                    },
                );
            }
        }
    }
}

struct ResolvedBatch {
    sync_root: PathBuf,
    changed: Vec<PathBuf>,
    deleted: Vec<PathBuf>,
}

/// Watch `session.root` and push settled changes through `pusher`.
///
/// Blocks until the session's cancel signal is raised (returning
/// `Ok(WatchOutcome::Cancelled)`) or a fatal error occurs.
pub fn run_watch(
    session: WatchSession,
    pusher: &dyn Pusher,
    out: &mut dyn Write,
) -> PodsyncResult<WatchOutcome> {
    WatchEngine::new(session).run(pusher, out)
}
