//! Pushing settled changes to the running component
//!
//! The watch engine only knows the [`Pusher`] trait. The concrete `oc`-based
//! implementation lives in [`oc`]; tests and embedders can pass a closure via
//! [`from_fn`].

mod oc;

pub use oc::{OcPusher, DEFAULT_DESTINATION};

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// One settled batch handed to a [`Pusher`]
#[derive(Debug, Clone, Copy)]
pub struct PushRequest<'a> {
    pub component: &'a str,
    pub application: &'a str,
    /// Local directory the changed paths live under
    pub sync_root: &'a Path,
    pub changed: &'a [PathBuf],
    pub deleted: &'a [PathBuf],
}

/// Errors a push can fail with. None of them end a watch session.
#[derive(Debug, Error)]
pub enum PushError {
    /// The push command ran and failed
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// The push tool could not be found or started
    #[error("not available: {0}")]
    NotAvailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Copies a batch of local changes into the running component
pub trait Pusher {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Push one batch; progress text goes to `out`
    fn push(&self, request: &PushRequest<'_>, out: &mut dyn Write) -> Result<(), PushError>;
}

/// A [`Pusher`] backed by a closure
pub struct FnPusher<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnPusher<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnPusher").finish_non_exhaustive()
    }
}

/// Wrap a closure as a [`Pusher`]
pub fn from_fn<F>(f: F) -> FnPusher<F>
where
    F: Fn(&PushRequest<'_>, &mut dyn Write) -> Result<(), PushError>,
{
    FnPusher { f }
}

impl<F> Pusher for FnPusher<F>
where
    F: Fn(&PushRequest<'_>, &mut dyn Write) -> Result<(), PushError>,
{
    fn name(&self) -> &str {
        "fn"
    }

    fn push(&self, request: &PushRequest<'_>, out: &mut dyn Write) -> Result<(), PushError> {
        (self.f)(request, out)
    }
}
