//! Cache directory for downloaded provider system-prompt text, keyed by model family and ETag.
//! Machine-written state, so JSON rather than the human-edited settings TOML.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::paths;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CacheEntry {
    etag: String,
    text: String,
}

/// A directory of cached system-prompt bodies, one JSON file per model
/// family, invalidated by ETag comparison rather than TTL.
pub struct PromptCache {
    dir: PathBuf,
}

impl PromptCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn at_default_location() -> Self {
        Self::new(paths::cache_dir())
    }

    fn entry_path(&self, model_family: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize(model_family)))
    }

    /// Returns the cached text for `model_family` if present and its stored
    /// ETag matches `etag`; otherwise `None` (a cache miss the caller should
    /// refill with [`PromptCache::store`]).
    pub fn get(&self, model_family: &str, etag: &str) -> Result<Option<String>> {
        let path = self.entry_path(model_family);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ConfigError::Io { path: path.display().to_string(), source }),
        };
        let entry: CacheEntry = serde_json::from_slice(&bytes)
            .map_err(|source| ConfigError::InvalidJson { file: path.display().to_string(), source })?;
        if entry.etag == etag {
            Ok(Some(entry.text))
        } else {
            debug!(model_family, "prompt cache stale, etag changed");
            Ok(None)
        }
    }

    pub fn store(&self, model_family: &str, etag: &str, text: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|source| ConfigError::Io { path: self.dir.display().to_string(), source })?;
        let path = self.entry_path(model_family);
        let entry = CacheEntry { etag: etag.to_string(), text: text.to_string() };
        let bytes = serde_json::to_vec_pretty(&entry)
            .map_err(|source| ConfigError::InvalidJson { file: path.display().to_string(), source })?;
        std::fs::write(&path, bytes)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })
    }
}

fn sanitize(model_family: &str) -> String {
    model_family.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' }).collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn miss_when_never_stored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = PromptCache::new(dir.path().to_path_buf());
        assert_eq!(cache.get("anthropic-claude", "etag-1").expect("get"), None);
    }

    #[test]
    fn hit_when_etag_matches_stale_when_it_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = PromptCache::new(dir.path().to_path_buf());
        cache.store("anthropic-claude", "etag-1", "system prompt text").expect("store");

        assert_eq!(
            cache.get("anthropic-claude", "etag-1").expect("get"),
            Some("system prompt text".to_string())
        );
        assert_eq!(cache.get("anthropic-claude", "etag-2").expect("get"), None);
    }
}
