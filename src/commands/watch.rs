use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use podsync::config::Config;
use podsync::ignores::watch_ignores;
use podsync::watcher::{cancel_pair, OutputFormat, WatchEngine, WatchOutcome, WatchSession};
use podsync::OcPusher;

/// Flags that override the loaded configuration
#[derive(Debug, Default)]
pub struct WatchArgs {
    pub delay: Option<u64>,
    pub ignores: Vec<String>,
    pub component: Option<String>,
    pub application: Option<String>,
    pub project: Option<String>,
    pub pod: Option<String>,
    pub container: Option<String>,
    pub destination: Option<String>,
}

pub fn cmd_watch(path: &Path, args: WatchArgs, json: bool) -> Result<()> {
    let (config, warnings) = Config::load_or_default(Some(path))?;
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    let config = apply_args(config, args);

    let root = watch_root(path, &config)?;
    // Globs are anchored at the directory being watched, or the file's parent
    let ignore_base = if root.is_file() {
        root.parent().map(Path::to_path_buf).unwrap_or_else(|| root.clone())
    } else {
        root.clone()
    };
    let patterns = watch_ignores(
        &ignore_base,
        &config.watch.ignores,
        config.watch.ignore_file.as_deref(),
    )?;

    let component = config
        .component
        .name
        .clone()
        .or_else(|| dir_name(path))
        .unwrap_or_else(|| "component".to_string());
    let application = config.component.application.clone().unwrap_or_default();

    let Some(pod) = config.push.pod.clone() else {
        bail!("no pod to push to; pass --pod, set PODSYNC_POD, or set push.pod in .podsync/config.yaml");
    };
    let pusher = OcPusher::new(pod)
        .with_oc_binary(config.push.oc_binary.clone())
        .with_namespace(config.component.project.clone())
        .with_container(config.push.container.clone())
        .with_destination(config.push.destination.clone());
    if !pusher.check_available() {
        tracing::warn!(oc = %config.push.oc_binary, "oc binary not found, pushes will fail until it is installed");
    }

    let (cancel, signal) = cancel_pair();
    ctrlc::set_handler(move || cancel.cancel()).context("failed to install Ctrl+C handler")?;

    let session = WatchSession::new(root, signal)
        .with_component(component)
        .with_application(application)
        .with_ignore_patterns(patterns)
        .with_sync_delay(config.watch.delay());

    let format = if json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let outcome = WatchEngine::new(session)
        .with_format(format)
        .with_timestamps(!json)
        .run(&pusher, &mut out)?;

    let WatchOutcome::Cancelled(summary) = outcome;
    tracing::info!(
        pushes = summary.pushes,
        failed = summary.failed_pushes,
        "watch finished"
    );
    Ok(())
}

fn apply_args(mut config: Config, args: WatchArgs) -> Config {
    if let Some(delay) = args.delay {
        config.watch.delay_secs = delay;
    }
    config.watch.ignores.extend(args.ignores);
    if args.component.is_some() {
        config.component.name = args.component;
    }
    if args.application.is_some() {
        config.component.application = args.application;
    }
    if args.project.is_some() {
        config.component.project = args.project;
    }
    if args.pod.is_some() {
        config.push.pod = args.pod;
    }
    if args.container.is_some() {
        config.push.container = args.container;
    }
    if let Some(destination) = args.destination {
        config.push.destination = destination;
    }
    config
}

/// Absolute watch root: `source_path` under the component dir, or the dir itself.
fn watch_root(path: &Path, config: &Config) -> Result<PathBuf> {
    let root = match &config.component.source_path {
        Some(source) => path.join(source),
        None => path.to_path_buf(),
    };

    if root.exists() {
        return root
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", root.display()));
    }
    if root.is_absolute() {
        return Ok(root);
    }
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    Ok(cwd.join(root))
}

fn dir_name(path: &Path) -> Option<String> {
    let path = path.canonicalize().ok()?;
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
