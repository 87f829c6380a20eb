//! Configuration loading

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PodsyncError, PodsyncResult};

use super::types::Config;

/// Directory holding the local component config
pub const CONFIG_DIR: &str = ".podsync";
/// Config file name inside [`CONFIG_DIR`] and the user config directory
pub const CONFIG_FILE: &str = "config.yaml";

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown config key '{}' in {}", self.key, self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{suggestion}'?)")?;
        }
        Ok(())
    }
}

/// Load configuration and collect non-fatal warnings (e.g. unknown keys).
pub fn load_with_warnings(path: &Path) -> PodsyncResult<(Config, Vec<ConfigWarning>)> {
    let content = fs::read_to_string(path)?;
    parse_with_warnings(&content, path)
}

pub(crate) fn parse_with_warnings(
    content: &str,
    path: &Path,
) -> PodsyncResult<(Config, Vec<ConfigWarning>)> {
    // An empty file is a valid, all-defaults config
    if content.trim().is_empty() {
        return Ok((Config::default(), Vec::new()));
    }

    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = serde_yaml_ng::Deserializer::from_str(content);

    let config: Config = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| PodsyncError::Config {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning {
                key: key.clone(),
                file: path.to_path_buf(),
                line: find_line_number(content, &key),
                suggestion: suggest_key(&key),
            }
        })
        .collect();

    Ok((config, warnings))
}

/// Load from the component config, user config, or defaults.
///
/// A config file that exists but cannot be parsed is an error; a missing
/// one is not.
pub fn load_or_default(component_dir: Option<&Path>) -> PodsyncResult<(Config, Vec<ConfigWarning>)> {
    if let Some(dir) = component_dir {
        let local = dir.join(CONFIG_DIR).join(CONFIG_FILE);
        if local.exists() {
            let (config, warnings) = load_with_warnings(&local)?;
            return Ok((with_env_overrides(config), warnings));
        }
    }

    if let Some(user_dir) = dirs::config_dir() {
        let user = user_dir.join("podsync").join(CONFIG_FILE);
        if user.exists() {
            let (config, warnings) = load_with_warnings(&user)?;
            return Ok((with_env_overrides(config), warnings));
        }
    }

    Ok((with_env_overrides(Config::default()), Vec::new()))
}

/// Apply environment variable overrides (PODSYNC_* prefix)
pub fn with_env_overrides(config: Config) -> Config {
    with_overrides_from(config, |key| std::env::var(key).ok())
}

pub(crate) fn with_overrides_from(
    mut config: Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Config {
    // PODSYNC_DELAY (seconds)
    if let Some(delay) = lookup("PODSYNC_DELAY") {
        match delay.trim().parse::<u64>() {
            Ok(secs) => config.watch.delay_secs = secs,
            Err(_) => tracing::warn!(value = %delay, "ignoring invalid PODSYNC_DELAY"),
        }
    }

    if let Some(name) = lookup("PODSYNC_COMPONENT") {
        config.component.name = Some(name);
    }

    if let Some(app) = lookup("PODSYNC_APPLICATION") {
        config.component.application = Some(app);
    }

    if let Some(project) = lookup("PODSYNC_PROJECT") {
        config.component.project = Some(project);
    }

    if let Some(pod) = lookup("PODSYNC_POD") {
        config.push.pod = Some(pod);
    }

    if let Some(oc) = lookup("PODSYNC_OC") {
        config.push.oc_binary = oc;
    }

    config
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    content
        .lines()
        .position(|line| line.contains(needle))
        .map(|i| i + 1)
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "component",
        "name",
        "application",
        "project",
        "source_path",
        "watch",
        "delay_secs",
        "ignores",
        "ignore_file",
        "push",
        "pod",
        "container",
        "destination",
        "oc_binary",
    ];

    CANDIDATES
        .iter()
        .map(|candidate| (candidate, levenshtein(unknown, candidate)))
        .min_by_key(|(_, dist)| *dist)
        .filter(|(_, dist)| *dist <= 2)
        .map(|(candidate, _)| candidate.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut prev: Vec<usize> = (0..=b_bytes.len()).collect();
    let mut curr = vec![0usize; b_bytes.len() + 1];

    for (i, &ac) in a_bytes.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_bytes.iter().enumerate() {
            let cost = usize::from(ac != bc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }

    prev[b_bytes.len()]
}
