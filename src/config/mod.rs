//! Configuration module for podsync
//!
//! Configuration hierarchy:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (PODSYNC_*)
//! 3. Component config (`.podsync/config.yaml`)
//! 4. User config (`<config dir>/podsync/config.yaml`)
//! 5. Built-in defaults (lowest priority)

mod loader;
mod types;

pub use loader::{with_env_overrides, ConfigWarning, CONFIG_DIR, CONFIG_FILE};
pub use types::{ComponentConfig, Config, PushConfig, WatchConfig};
