//! Recursive watch registration
//!
//! The underlying watches are registered one directory at a time: nothing is
//! inherited, so every non-ignored directory under the root gets its own
//! watch. Ignored directories are pruned before their contents are visited.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use notify::{RecommendedWatcher, RecursiveMode};

use crate::error::{PodsyncError, PodsyncResult};

use super::matcher::IgnoreMatcher;

/// The set of live watches, as seen by the registrar and the observer
pub(crate) trait WatchRegistry {
    fn watch(&mut self, path: &Path) -> notify::Result<()>;
    fn unwatch(&mut self, path: &Path) -> notify::Result<()>;
}

impl WatchRegistry for RecommendedWatcher {
    fn watch(&mut self, path: &Path) -> notify::Result<()> {
        notify::Watcher::watch(self, path, RecursiveMode::NonRecursive)
    }

    fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
        notify::Watcher::unwatch(self, path)
    }
}

/// Watch `root` and, if it is a directory, every non-ignored directory below it.
///
/// Non-directory entries found below a directory root are handed to
/// `on_file`. Returns the number of watches added. A root that does not
/// exist (or vanished mid-walk) is not an error.
pub(crate) fn register_recursive<R: WatchRegistry>(
    registry: &mut R,
    root: &Path,
    matcher: &IgnoreMatcher,
    mut on_file: impl FnMut(PathBuf),
) -> PodsyncResult<usize> {
    let mut watched = 0;

    let metadata = match fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(watched),
        Err(err) => return Err(err.into()),
    };

    if matcher.is_ignored(root) {
        return Ok(watched);
    }

    if !metadata.is_dir() {
        add_watch(registry, root, &mut watched)?;
        return Ok(watched);
    }

    let filter = matcher.clone();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| !filter.is_ignored(entry.path()))
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };

        if entry.file_type().is_some_and(|t| t.is_dir()) {
            add_watch(registry, entry.path(), &mut watched)?;
        } else {
            on_file(entry.into_path());
        }
    }

    Ok(watched)
}

fn add_watch<R: WatchRegistry>(
    registry: &mut R,
    path: &Path,
    watched: &mut usize,
) -> PodsyncResult<()> {
    match registry.watch(path) {
        Ok(()) => {
            *watched += 1;
            Ok(())
        }
        Err(err) if is_vanished(&err) => {
            tracing::debug!(path = %path.display(), "path vanished before it could be watched");
            Ok(())
        }
        Err(err) => Err(PodsyncError::from_notify(path, err)),
    }
}

pub(crate) fn is_vanished(err: &notify::Error) -> bool {
    match &err.kind {
        notify::ErrorKind::PathNotFound => true,
        notify::ErrorKind::Io(io) => io.kind() == IoErrorKind::NotFound,
        _ => false,
    }
}
