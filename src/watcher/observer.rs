//! Filesystem observer
//!
//! Drains raw `notify` events on its own thread and folds them into the shared
//! [`PendingChangeSet`]. It never reports errors directly: anything that ends
//! the session is parked in the change set for the coordinator to pick up.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crossbeam_channel::{select, Receiver};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

use crate::error::PodsyncError;

use super::matcher::IgnoreMatcher;
use super::registrar::{register_recursive, WatchRegistry};
use super::session::CancelSignal;
use super::state::{lock, PendingChangeSet};

/// One path-level change derived from a raw event
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FsChange {
    Created(PathBuf),
    Written(PathBuf),
    Removed(PathBuf),
}

/// Split a raw event into path-level changes.
///
/// Renames are reported by the backend either as a from/to pair or as a
/// single ambiguous event; the ambiguous kind is resolved by checking whether
/// the path still exists.
pub(crate) fn classify(event: &Event) -> Vec<FsChange> {
    let paths = event.paths.iter().cloned();
    match event.kind {
        EventKind::Create(_) => paths.map(FsChange::Created).collect(),
        EventKind::Remove(_) => paths.map(FsChange::Removed).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.map(FsChange::Removed).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.map(FsChange::Created).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::with_capacity(2);
            if let Some(from) = event.paths.first() {
                out.push(FsChange::Removed(from.clone()));
            }
            if let Some(to) = event.paths.get(1) {
                out.push(FsChange::Created(to.clone()));
            }
            out
        }
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .map(|p| {
                if p.exists() {
                    FsChange::Created(p)
                } else {
                    FsChange::Removed(p)
                }
            })
            .collect(),
        EventKind::Modify(_) => paths.map(FsChange::Written).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

pub(crate) struct Observer<R> {
    root: PathBuf,
    registry: R,
    matcher: IgnoreMatcher,
    state: Arc<Mutex<PendingChangeSet>>,
}

impl<R: WatchRegistry> Observer<R> {
    pub(crate) fn new(
        root: PathBuf,
        registry: R,
        matcher: IgnoreMatcher,
        state: Arc<Mutex<PendingChangeSet>>,
    ) -> Self {
        Self {
            root,
            registry,
            matcher,
            state,
        }
    }

    /// Process events until cancelled or something fatal happens
    pub(crate) fn run(mut self, events: Receiver<notify::Result<Event>>, cancel: CancelSignal) {
        loop {
            select! {
                recv(events) -> msg => match msg {
                    Ok(Ok(event)) => {
                        if let Err(err) = self.handle_event(&event) {
                            self.stop(err);
                            return;
                        }
                    }
                    Ok(Err(err)) => {
                        let path = err.paths.first().cloned().unwrap_or_default();
                        self.stop(PodsyncError::from_notify(path, err));
                        return;
                    }
                    Err(_) => {
                        self.stop(PodsyncError::EventSourceClosed);
                        return;
                    }
                },
                // A raised signal and a dropped handle both end the session
                recv(cancel.receiver()) -> _ => {
                    self.stop(PodsyncError::Cancelled);
                    return;
                }
            }
        }
    }

    fn stop(&self, err: PodsyncError) {
        if !err.is_cancelled() {
            tracing::error!(error = %err, "watch failed");
        }
        lock(&self.state).fail(err);
    }

    pub(crate) fn handle_event(&mut self, event: &Event) -> Result<(), PodsyncError> {
        tracing::debug!(kind = ?event.kind, paths = ?event.paths, "filesystem event");

        // The backend dropped events; whatever they described is gone
        if event.need_rescan() {
            return Err(PodsyncError::Watch {
                path: self.root.clone(),
                message: "filesystem event queue overflowed, changes were lost".to_string(),
            });
        }

        let mut pending = lock(&self.state);
        for change in classify(event) {
            match change {
                FsChange::Removed(path) => {
                    if self.matcher.is_ignored(&path) {
                        continue;
                    }
                    // Plain files inside a watched directory have no watch of their own
                    if let Err(err) = self.registry.unwatch(&path) {
                        tracing::trace!(path = %path.display(), error = %err, "unwatch skipped");
                    }
                    pending.record_delete(path);
                }
                FsChange::Created(path) | FsChange::Written(path)
                    if self.matcher.is_ignored(&path) =>
                {
                    tracing::trace!(path = %path.display(), "ignored");
                }
                FsChange::Written(path) => {
                    match fs::metadata(&path) {
                        // Some platforms report a directory write next to the create inside it
                        Ok(metadata) if metadata.is_dir() => {}
                        Ok(_) => pending.record_change(path),
                        Err(err) => {
                            tracing::debug!(path = %path.display(), error = %err, "changed path vanished");
                        }
                    }
                }
                FsChange::Created(path) => {
                    let metadata = match fs::metadata(&path) {
                        Ok(metadata) => metadata,
                        Err(err) => {
                            tracing::debug!(path = %path.display(), error = %err, "created path vanished");
                            continue;
                        }
                    };
                    if metadata.is_dir() {
                        let watched = register_recursive(
                            &mut self.registry,
                            &path,
                            &self.matcher,
                            |file| pending.record_change(file),
                        )?;
                        tracing::debug!(path = %path.display(), watched, "watching new directory");
                    }
                    pending.record_change(path);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, Flag, RemoveKind};
    use std::path::Path;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingRegistry {
        watched: Vec<PathBuf>,
        unwatched: Vec<PathBuf>,
    }

    impl WatchRegistry for RecordingRegistry {
        fn watch(&mut self, path: &Path) -> notify::Result<()> {
            self.watched.push(path.to_path_buf());
            Ok(())
        }

        fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
            self.unwatched.push(path.to_path_buf());
            Err(notify::Error::watch_not_found())
        }
    }

    fn observer(patterns: &[&str]) -> Observer<RecordingRegistry> {
        Observer::new(
            PathBuf::from("/src/app"),
            RecordingRegistry::default(),
            IgnoreMatcher::new(patterns).unwrap(),
            Arc::new(Mutex::new(PendingChangeSet::new())),
        )
    }

    fn event(kind: EventKind, path: &Path) -> Event {
        Event::new(kind).add_path(path.to_path_buf())
    }

    #[test]
    fn classify_rename_pair() {
        let ev = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/d/old"))
            .add_path(PathBuf::from("/d/new"));
        assert_eq!(
            classify(&ev),
            vec![
                FsChange::Removed(PathBuf::from("/d/old")),
                FsChange::Created(PathBuf::from("/d/new")),
            ]
        );
    }

    #[test]
    fn classify_access_is_ignored() {
        let ev = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/d/a"));
        assert!(classify(&ev).is_empty());
    }

    #[test]
    fn created_file_is_recorded() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("b.txt");
        fs::write(&file, "b").unwrap();

        let mut obs = observer(&[]);
        obs.handle_event(&event(EventKind::Create(CreateKind::File), &file))
            .unwrap();

        let state = lock(&obs.state);
        assert!(state.is_dirty());
        assert!(state.is_changed(&file));
        assert!(obs.registry.watched.is_empty());
    }

    #[test]
    fn created_directory_is_watched_with_its_contents() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("pkg");
        fs::create_dir_all(sub.join("inner")).unwrap();
        fs::write(sub.join("inner/mod.rs"), "").unwrap();

        let mut obs = observer(&[]);
        obs.handle_event(&event(EventKind::Create(CreateKind::Folder), &sub))
            .unwrap();

        assert_eq!(obs.registry.watched, vec![sub.clone(), sub.join("inner")]);
        let state = lock(&obs.state);
        assert!(state.is_changed(&sub));
        assert!(state.is_changed(&sub.join("inner/mod.rs")));
    }

    #[test]
    fn directory_writes_are_suppressed() {
        let dir = tempdir().unwrap();
        let mut obs = observer(&[]);
        obs.handle_event(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Any)),
            dir.path(),
        ))
        .unwrap();

        assert!(!lock(&obs.state).is_dirty());
    }

    #[test]
    fn vanished_paths_are_skipped() {
        let dir = tempdir().unwrap();
        let mut obs = observer(&[]);
        obs.handle_event(&event(
            EventKind::Create(CreateKind::File),
            &dir.path().join(".main.go.swx"),
        ))
        .unwrap();

        assert!(!lock(&obs.state).is_dirty());
    }

    #[test]
    fn ignored_paths_are_never_reported() {
        let dir = tempdir().unwrap();
        let git = dir.path().join(".git");
        fs::create_dir_all(&git).unwrap();

        let mut obs = observer(&[r"\.git"]);
        obs.handle_event(&event(EventKind::Create(CreateKind::Folder), &git))
            .unwrap();
        obs.handle_event(&event(EventKind::Remove(RemoveKind::Any), &git.join("index.lock")))
            .unwrap();

        assert!(!lock(&obs.state).is_dirty());
        assert!(obs.registry.watched.is_empty());
    }

    #[test]
    fn removal_unwatches_and_overrides_change() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("c.txt");
        fs::write(&file, "c").unwrap();

        let mut obs = observer(&[]);
        obs.handle_event(&event(EventKind::Create(CreateKind::File), &file))
            .unwrap();
        fs::remove_file(&file).unwrap();
        obs.handle_event(&event(EventKind::Remove(RemoveKind::File), &file))
            .unwrap();

        assert_eq!(obs.registry.unwatched, vec![file.clone()]);
        let state = lock(&obs.state);
        assert!(!state.is_changed(&file));
        assert!(state.is_deleted(&file));
    }

    #[test]
    fn cancel_parks_sentinel() {
        let obs = observer(&[]);
        let state = Arc::clone(&obs.state);
        let (_tx, rx) = crossbeam_channel::unbounded::<notify::Result<Event>>();
        let (handle, signal) = super::super::session::cancel_pair();

        handle.cancel();
        obs.run(rx, signal);

        assert!(matches!(
            lock(&state).take_failure(),
            Some(PodsyncError::Cancelled)
        ));
    }

    #[test]
    fn watch_error_parks_failure() {
        let obs = observer(&[]);
        let state = Arc::clone(&obs.state);
        let (tx, rx) = crossbeam_channel::unbounded::<notify::Result<Event>>();
        let (_handle, signal) = super::super::session::cancel_pair();

        tx.send(Err(notify::Error::io(std::io::Error::other("read failed"))
            .add_path(PathBuf::from("/src/app"))))
            .unwrap();
        obs.run(rx, signal);

        assert!(matches!(
            lock(&state).take_failure(),
            Some(PodsyncError::Watch { .. })
        ));
    }

    #[test]
    fn queue_overflow_is_fatal() {
        let mut obs = observer(&[]);
        let overflow = Event::new(EventKind::Other).set_flag(Flag::Rescan);

        let err = obs.handle_event(&overflow).unwrap_err();

        match err {
            PodsyncError::Watch { path, message } => {
                assert_eq!(path, PathBuf::from("/src/app"));
                assert!(message.contains("overflow"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!lock(&obs.state).is_dirty());
    }

    #[test]
    fn queue_overflow_parks_failure() {
        let obs = observer(&[]);
        let state = Arc::clone(&obs.state);
        let (tx, rx) = crossbeam_channel::unbounded::<notify::Result<Event>>();
        let (_handle, signal) = super::super::session::cancel_pair();

        tx.send(Ok(Event::new(EventKind::Other).set_flag(Flag::Rescan)))
            .unwrap();
        obs.run(rx, signal);

        assert!(matches!(
            lock(&state).take_failure(),
            Some(PodsyncError::Watch { .. })
        ));
    }
}
