//! Push through the `oc` binary
//!
//! Changed files are copied one by one with `oc cp`; new directories and
//! deletions are applied with a single `oc exec` each.

use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use super::{PushError, PushRequest, Pusher};

/// Default directory inside the container that receives the sources
pub const DEFAULT_DESTINATION: &str = "/opt/app-root/src";

/// Pushes files into a pod by shelling out to `oc`
#[derive(Debug, Clone)]
pub struct OcPusher {
    oc_binary: String,
    pod: String,
    namespace: Option<String>,
    container: Option<String>,
    destination: String,
}

impl OcPusher {
    pub fn new(pod: impl Into<String>) -> Self {
        Self {
            oc_binary: "oc".to_string(),
            pod: pod.into(),
            namespace: None,
            container: None,
            destination: DEFAULT_DESTINATION.to_string(),
        }
    }

    pub fn with_oc_binary(mut self, oc: impl Into<String>) -> Self {
        self.oc_binary = oc.into();
        self
    }

    /// Project the pod lives in; `oc` falls back to the current project
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn with_container(mut self, container: Option<String>) -> Self {
        self.container = container;
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Check if the `oc` binary can be run
    pub fn check_available(&self) -> bool {
        Command::new(&self.oc_binary)
            .args(["version", "--client"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Container path for a local path under `sync_root`
    fn remote_path(&self, sync_root: &Path, local: &Path) -> Result<String, PushError> {
        let rel = local.strip_prefix(sync_root).map_err(|_| {
            PushError::Other(format!(
                "{} is outside the sync root {}",
                local.display(),
                sync_root.display()
            ))
        })?;
        let mut remote = self.destination.trim_end_matches('/').to_string();
        for part in rel.components() {
            remote.push('/');
            remote.push_str(&part.as_os_str().to_string_lossy());
        }
        Ok(remote)
    }

    /// `-n` and `-c` flags shared by `cp` and `exec`
    fn target_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ns) = &self.namespace {
            args.extend(["-n".to_string(), ns.clone()]);
        }
        if let Some(c) = &self.container {
            args.extend(["-c".to_string(), c.clone()]);
        }
        args
    }

    fn cp_args(&self, local: &Path, remote: &str) -> Vec<String> {
        let mut args = vec![
            "cp".to_string(),
            local.display().to_string(),
            format!("{}:{}", self.pod, remote),
        ];
        args.extend(self.target_args());
        args
    }

    fn exec_args(&self, command: &[&str], paths: &[String]) -> Vec<String> {
        let mut args = vec!["exec".to_string(), self.pod.clone()];
        args.extend(self.target_args());
        args.push("--".to_string());
        args.extend(command.iter().map(|s| s.to_string()));
        args.extend(paths.iter().cloned());
        args
    }

    fn run(&self, args: &[String], out: &mut dyn Write) -> Result<(), PushError> {
        tracing::debug!(oc = %self.oc_binary, ?args, "running");
        let output = Command::new(&self.oc_binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    PushError::NotAvailable(format!("'{}' not found in PATH", self.oc_binary))
                }
                _ => PushError::Io(e),
            })?;

        out.write_all(&output.stdout)?;

        if !output.status.success() {
            return Err(PushError::CommandFailed(format!(
                "{} {} exited with {:?}: {}",
                self.oc_binary,
                args.first().map(String::as_str).unwrap_or_default(),
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Pusher for OcPusher {
    fn name(&self) -> &str {
        "oc"
    }

    fn push(&self, request: &PushRequest<'_>, out: &mut dyn Write) -> Result<(), PushError> {
        let mut new_dirs = Vec::new();
        let mut files = Vec::new();
        for path in request.changed {
            let remote = self.remote_path(request.sync_root, path)?;
            if path.is_dir() {
                new_dirs.push(remote);
            } else {
                files.push((path, remote));
            }
        }

        if !new_dirs.is_empty() {
            self.run(&self.exec_args(&["mkdir", "-p"], &new_dirs), out)?;
        }
        for (local, remote) in files {
            self.run(&self.cp_args(local, &remote), out)?;
        }

        if !request.deleted.is_empty() {
            let remotes = request
                .deleted
                .iter()
                .map(|p| self.remote_path(request.sync_root, p))
                .collect::<Result<Vec<_>, _>>()?;
            self.run(&self.exec_args(&["rm", "-rf"], &remotes), out)?;
        }

        Ok(())
    }
}
