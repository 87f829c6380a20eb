//! Watch session options and the one-shot signals a caller uses to drive it

use std::path::PathBuf;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

/// Default quiet period before a batch of changes is pushed
pub const DEFAULT_SYNC_DELAY: Duration = Duration::from_secs(1);

/// Everything one `watch` invocation needs.
///
/// Built by the caller with the `with_*` methods and handed to
/// [`WatchEngine`](super::WatchEngine) by value; it does not change while the
/// session runs.
#[derive(Debug)]
pub struct WatchSession {
    /// Component the pushed files belong to (opaque to the engine)
    pub component_name: String,
    /// Application the component belongs to (opaque to the engine)
    pub application_name: String,
    /// Absolute path to watch, either a directory or a single file
    pub root: PathBuf,
    /// Regular expressions matched against absolute paths
    pub ignore_patterns: Vec<String>,
    /// Quiet period after the last change before pushing
    pub sync_delay: Duration,
    pub(crate) ready: Option<Sender<()>>,
    pub(crate) cancel: CancelSignal,
}

impl WatchSession {
    /// Create a session for `root` that stops when `cancel` is raised.
    pub fn new(root: impl Into<PathBuf>, cancel: CancelSignal) -> Self {
        Self {
            component_name: String::new(),
            application_name: String::new(),
            root: root.into(),
            ignore_patterns: Vec::new(),
            sync_delay: DEFAULT_SYNC_DELAY,
            ready: None,
            cancel,
        }
    }

    /// Set the component name passed through to the pusher
    pub fn with_component(mut self, name: impl Into<String>) -> Self {
        self.component_name = name.into();
        self
    }

    /// Set the application name passed through to the pusher
    pub fn with_application(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Set the ignore regexes
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Set the debounce window
    pub fn with_sync_delay(mut self, delay: Duration) -> Self {
        self.sync_delay = delay;
        self
    }

    /// Fire `ready` once the initial watches are registered.
    ///
    /// Tests use this to avoid touching files before the watcher can see them.
    pub fn with_ready_signal(mut self, ready: Sender<()>) -> Self {
        self.ready = Some(ready);
        self
    }
}

/// Create a linked cancel handle/signal pair.
///
/// The handle stays with the caller (e.g. a Ctrl+C handler); the signal goes
/// into the [`WatchSession`].
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = bounded(1);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Caller side of the cancel signal.
///
/// Dropping every clone of the handle also cancels the session.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Sender<()>,
}

impl CancelHandle {
    /// Ask the session to stop. Safe to call more than once.
    pub fn cancel(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Engine side of the cancel signal
#[derive(Debug)]
pub struct CancelSignal {
    rx: Receiver<()>,
}

impl CancelSignal {
    pub(crate) fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}
