//! The human-edited settings file: theme, default model, steering mode, hidden models, extension
//! paths, compaction threshold, retry parameters. TOML on disk, kept separate from the
//! machine-written session and credential state, which stay JSON.

use std::path::{Path, PathBuf};

use kestrel_protocol::tool::SteeringMode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};
use crate::paths;

/// Retry/backoff parameters, mirrored into `kestrel-provider`'s retry policy
/// at startup so they're user-tunable without a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 500, max_delay_ms: 30_000, multiplier: 2.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    pub steering_mode: SteeringMode,
    pub hidden_models: Vec<String>,
    pub extension_paths: Vec<PathBuf>,
    /// Fraction of the model's context window that triggers proactive
    /// auto-compaction. Spec default: 0.8.
    pub compaction_threshold: f32,
    pub retry: RetrySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "default".into(),
            default_model: None,
            steering_mode: SteeringMode::Steer,
            hidden_models: Vec::new(),
            extension_paths: Vec::new(),
            compaction_threshold: 0.8,
            retry: RetrySettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, falling back to defaults if the file
    /// doesn't exist yet (first run).
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file yet, using defaults");
                return Ok(Settings::default());
            }
            Err(source) => {
                return Err(ConfigError::Io { path: path.display().to_string(), source });
            }
        };
        toml::from_str(&text)
            .map_err(|source| ConfigError::InvalidToml { file: path.display().to_string(), source })
    }

    /// Loads from the default settings path (`~/.kestrel/settings.toml`).
    pub fn load_default() -> Result<Self> {
        Self::load(&paths::settings_path())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| ConfigError::Io { path: parent.display().to_string(), source })?;
        }
        let text = toml::to_string_pretty(self)
            .map_err(|source| ConfigError::SerializeToml { file: path.display().to_string(), source })?;
        std::fs::write(path, text)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })
    }

    /// `true` once the given fraction of context window usage has been
    /// reached — the proactive auto-compaction trigger.
    pub fn should_auto_compact(&self, used_fraction: f32) -> bool {
        if self.compaction_threshold <= 0.0 {
            warn!("compaction_threshold <= 0, auto-compaction effectively disabled");
        }
        used_fraction >= self.compaction_threshold
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        let settings = Settings::load(&path).expect("load");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        let mut settings = Settings::default();
        settings.theme = "dracula".into();
        settings.hidden_models.push("openai/gpt-3.5".into());
        settings.save(&path).expect("save");

        let loaded = Settings::load(&path).expect("load");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn auto_compact_triggers_at_threshold() {
        let settings = Settings::default();
        assert!(!settings.should_auto_compact(0.5));
        assert!(settings.should_auto_compact(0.8));
        assert!(settings.should_auto_compact(0.95));
    }
}
