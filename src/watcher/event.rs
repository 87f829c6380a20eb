//! Progress events emitted while watching

use std::io::Write;

/// How progress is written to the output sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One human-readable line per event
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Watch event types for text and NDJSON output
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WatchEvent {
    /// Initial watches are in place
    WatchStarted { root: String, watched: usize },
    /// Nothing pending; emitted once per idle period
    Waiting { root: String },
    FileChanged { path: String },
    FileDeleted { path: String },
    PushStarted { changed: usize, deleted: usize },
    PushComplete,
    /// A push failed; the session keeps running
    PushFailed { message: String },
    /// Watch stopped at the user's request
    Shutdown,
}

impl WatchEvent {
    /// Convert to JSON string with "command": "watch" field included
    pub fn to_json(&self) -> String {
        let mut value =
            serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({"event": "error"}));
        if let Some(obj) = value.as_object_mut() {
            obj.insert("command".to_string(), serde_json::json!("watch"));
        }
        serde_json::to_string(&value).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn to_text(&self) -> String {
        match self {
            WatchEvent::WatchStarted { root, watched } => {
                format!("Watching {root} ({watched} watches)")
            }
            WatchEvent::Waiting { root } => format!("Waiting for something to change in {root}"),
            WatchEvent::FileChanged { path } => format!("File {path} changed"),
            WatchEvent::FileDeleted { path } => format!("File {path} deleted"),
            WatchEvent::PushStarted { .. } => "Pushing files...".to_string(),
            WatchEvent::PushComplete => "Push complete".to_string(),
            WatchEvent::PushFailed { message } => format!("Push failed: {message}"),
            WatchEvent::Shutdown => "Watch stopped".to_string(),
        }
    }
}

/// Writes events to the session's output sink
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Reporter {
    pub format: OutputFormat,
    pub timestamps: bool,
}

impl Reporter {
    pub(crate) fn emit(&self, out: &mut dyn Write, event: &WatchEvent) {
        let line = match self.format {
            OutputFormat::Json => event.to_json(),
            OutputFormat::Text if self.timestamps => format!(
                "[{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                event.to_text()
            ),
            OutputFormat::Text => event.to_text(),
        };
        // Progress output is best-effort; a closed pipe must not end the session
        if let Err(err) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            tracing::debug!(error = %err, "failed to write progress");
        }
    }
}
