//! Pending changes shared between the observer and the coordinator

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::PodsyncError;

/// Changes seen since the last push.
///
/// `changed` and `deleted` never share a path; the latest event for a path
/// decides which set it is in. `dirty` holds exactly when either set is
/// non-empty.
#[derive(Debug, Default)]
pub struct PendingChangeSet {
    dirty: bool,
    last_change: Option<Instant>,
    changed: BTreeSet<PathBuf>,
    deleted: BTreeSet<PathBuf>,
    sticky: Option<PodsyncError>,
}

/// A settled batch taken out of [`PendingChangeSet`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub changed: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty()
    }
}

impl PendingChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a created or modified path
    pub fn record_change(&mut self, path: PathBuf) {
        self.record_change_at(path, Instant::now());
    }

    pub fn record_change_at(&mut self, path: PathBuf, now: Instant) {
        self.deleted.remove(&path);
        self.changed.insert(path);
        self.touch(now);
    }

    /// Record a removed or renamed-away path
    pub fn record_delete(&mut self, path: PathBuf) {
        self.record_delete_at(path, Instant::now());
    }

    pub fn record_delete_at(&mut self, path: PathBuf, now: Instant) {
        self.changed.remove(&path);
        self.deleted.insert(path);
        self.touch(now);
    }

    fn touch(&mut self, now: Instant) {
        self.dirty = true;
        self.last_change = Some(now);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the pending changes have been quiet for at least `delay`
    pub fn is_settled(&self, delay: Duration, now: Instant) -> bool {
        match self.last_change {
            Some(last) => self.dirty && now.saturating_duration_since(last) >= delay,
            None => false,
        }
    }

    /// Take every pending change, leaving the set clean
    pub fn take_batch(&mut self) -> ChangeBatch {
        self.dirty = false;
        self.last_change = None;
        ChangeBatch {
            changed: std::mem::take(&mut self.changed).into_iter().collect(),
            deleted: std::mem::take(&mut self.deleted).into_iter().collect(),
        }
    }

    pub fn is_changed(&self, path: &Path) -> bool {
        self.changed.contains(path)
    }

    pub fn is_deleted(&self, path: &Path) -> bool {
        self.deleted.contains(path)
    }

    /// Record a session-ending error. The first one wins.
    pub fn fail(&mut self, err: PodsyncError) {
        if self.sticky.is_none() {
            self.sticky = Some(err);
        }
    }

    pub fn has_failed(&self) -> bool {
        self.sticky.is_some()
    }

    /// Hand the session-ending error to whoever is about to report it
    pub(crate) fn take_failure(&mut self) -> Option<PodsyncError> {
        self.sticky.take()
    }
}

/// Lock shared state, recovering the data if the other side panicked
pub(crate) fn lock(state: &Mutex<PendingChangeSet>) -> MutexGuard<'_, PendingChangeSet> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
