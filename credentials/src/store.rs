//! [`CredentialStore`]: the JSON-file-backed keyed map from provider id to
//! credential, implementing `getApiKey`'s five-step resolution order.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use kestrel_agent_core::{AgentError, ApiKeyResolver};
use tracing::debug;

use crate::credential::{Credential, CredentialMap};
use crate::error::{CredentialError, Result};
use crate::lock;

/// The result of a provider's OAuth refresh exchange.
pub struct RefreshedOAuth {
    pub access: String,
    pub refresh: String,
    pub expires: chrono::DateTime<Utc>,
}

/// Performs the provider-specific HTTP exchange to turn a refresh token into
/// a new access token. `kestrel-credentials` owns locking and persistence;
/// it knows nothing about any particular provider's OAuth endpoint.
#[async_trait]
pub trait OAuthRefresher: Send + Sync {
    async fn refresh(&self, provider: &str, refresh_token: &str) -> std::result::Result<RefreshedOAuth, Box<dyn std::error::Error + Send + Sync>>;
}

pub struct CredentialStoreBuilder {
    path: PathBuf,
    refreshers: HashMap<String, Arc<dyn OAuthRefresher>>,
    fallback: Option<Arc<dyn ApiKeyResolver>>,
}

impl CredentialStoreBuilder {
    pub fn new(path: PathBuf) -> Self {
        Self { path, refreshers: HashMap::new(), fallback: None }
    }

    pub fn with_refresher(mut self, provider: impl Into<String>, refresher: Arc<dyn OAuthRefresher>) -> Self {
        self.refreshers.insert(provider.into(), refresher);
        self
    }

    /// Step 5 of `getApiKey`'s resolution order: consulted only after the
    /// store, then the environment, come up empty.
    pub fn with_fallback(mut self, fallback: Arc<dyn ApiKeyResolver>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn build(self) -> CredentialStore {
        CredentialStore {
            path: self.path,
            runtime_overrides: RwLock::new(HashMap::new()),
            refreshers: self.refreshers,
            fallback: self.fallback,
        }
    }
}

pub struct CredentialStore {
    path: PathBuf,
    runtime_overrides: RwLock<HashMap<String, String>>,
    refreshers: HashMap<String, Arc<dyn OAuthRefresher>>,
    fallback: Option<Arc<dyn ApiKeyResolver>>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        CredentialStoreBuilder::new(path).build()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sets the current process's override for `provider`, taking priority
    /// over anything on disk. Never persisted; set by a CLI flag at
    /// startup.
    pub fn set_runtime_override(&self, provider: impl Into<String>, key: impl Into<String>) {
        let mut guard = self.runtime_overrides.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.insert(provider.into(), key.into());
    }

    pub fn store_api_key(&self, provider: impl Into<String>, key: impl Into<String>) -> Result<()> {
        let mut map = load_map(&self.path)?;
        map.insert(provider.into(), Credential::ApiKey { key: key.into() });
        save_map(&self.path, &map)
    }

    pub fn store_oauth(&self, provider: impl Into<String>, credential: Credential) -> Result<()> {
        let mut map = load_map(&self.path)?;
        map.insert(provider.into(), credential);
        save_map(&self.path, &map)
    }

    pub fn delete(&self, provider: &str) -> Result<()> {
        let mut map = load_map(&self.path)?;
        map.remove(provider);
        save_map(&self.path, &map)
    }

    /// `getApiKey(provider)`: runtime override, then a stored api-key, then a stored (and refreshed if
    /// needed) OAuth token, then an environment variable, then the caller-supplied fallback.
    pub async fn get_api_key(&self, provider: &str) -> Result<String> {
        if let Some(key) = self.runtime_override(provider) {
            return Ok(key);
        }

        let map = load_map(&self.path)?;
        match map.get(provider) {
            Some(Credential::ApiKey { key }) => return Ok(key.clone()),
            Some(credential @ Credential::OAuth { access, project_id, .. }) => {
                if credential.is_expired(Utc::now()) {
                    return self.refresh_oauth(provider).await;
                }
                return Ok(format_oauth_token(access, project_id.as_deref()));
            }
            None => {}
        }

        if let Ok(key) = std::env::var(env_var_name(provider)) {
            return Ok(key);
        }

        if let Some(fallback) = &self.fallback {
            return fallback
                .resolve(provider)
                .await
                .map_err(|source| CredentialError::RefreshFailed { provider: provider.to_string(), message: source.to_string() });
        }

        Err(CredentialError::NoKeyForProvider(provider.to_string()))
    }

    fn runtime_override(&self, provider: &str) -> Option<String> {
        let guard = self.runtime_overrides.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.get(provider).cloned()
    }

    /// Acquires the cross-process lock, re-reads the file (another process
    /// may have already refreshed), and only then performs the HTTP
    /// exchange.
    async fn refresh_oauth(&self, provider: &str) -> Result<String> {
        let lock_path = self.path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CredentialError::Io { path: parent.display().to_string(), source })?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)
            .map_err(|source| CredentialError::Io { path: lock_path.display().to_string(), source })?;

        lock::acquire_exclusive(&lock_file).await?;
        let result = self.refresh_oauth_locked(provider).await;
        lock::release_exclusive(&lock_file);
        result
    }

    async fn refresh_oauth_locked(&self, provider: &str) -> Result<String> {
        let mut map = load_map(&self.path)?;

        if let Some(credential @ Credential::OAuth { access, project_id, .. }) = map.get(provider) {
            if !credential.is_expired(Utc::now()) {
                debug!(provider, "another process already refreshed this token");
                return Ok(format_oauth_token(access, project_id.as_deref()));
            }
        }

        let Some(Credential::OAuth { refresh, project_id, .. }) = map.get(provider).cloned() else {
            return Err(CredentialError::NoKeyForProvider(provider.to_string()));
        };

        let refresher = self
            .refreshers
            .get(provider)
            .ok_or_else(|| CredentialError::RefreshFailed { provider: provider.to_string(), message: "no OAuth refresher registered for this provider".into() })?;

        let refreshed = refresher
            .refresh(provider, &refresh)
            .await
            .map_err(|source| CredentialError::RefreshFailed { provider: provider.to_string(), message: source.to_string() })?;

        let token = format_oauth_token(&refreshed.access, project_id.as_deref());
        map.insert(
            provider.to_string(),
            Credential::OAuth { access: refreshed.access, refresh: refreshed.refresh, expires: refreshed.expires, project_id },
        );
        // A failed refresh never reaches here, so existing credentials are
        // left untouched on failure.
        save_map(&self.path, &map)?;
        Ok(token)
    }
}

#[async_trait]
impl ApiKeyResolver for CredentialStore {
    async fn resolve(&self, provider: &str) -> std::result::Result<String, AgentError> {
        self.get_api_key(provider).await.map_err(|source| AgentError::CredentialResolution(provider.to_string(), source.to_string()))
    }
}

fn format_oauth_token(access: &str, project_id: Option<&str>) -> String {
    match project_id {
        Some(project_id) => serde_json::json!({ "token": access, "projectId": project_id }).to_string(),
        None => access.to_string(),
    }
}

fn env_var_name(provider: &str) -> String {
    format!("{}_API_KEY", provider.to_uppercase().replace('-', "_"))
}

fn load_map(path: &Path) -> Result<CredentialMap> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(CredentialMap::new()),
        Err(source) => return Err(CredentialError::Io { path: path.display().to_string(), source }),
    };
    serde_json::from_slice(&bytes).map_err(|source| CredentialError::InvalidJson { path: path.display().to_string(), source })
}

fn save_map(path: &Path, map: &CredentialMap) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| CredentialError::Io { path: parent.display().to_string(), source })?;
        set_permissions(parent, 0o700)?;
    }
    let bytes = serde_json::to_vec_pretty(map).map_err(|source| CredentialError::InvalidJson { path: path.display().to_string(), source })?;
    std::fs::write(path, &bytes).map_err(|source| CredentialError::Io { path: path.display().to_string(), source })?;
    set_permissions(path, 0o600)?;
    Ok(())
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|source| CredentialError::Io { path: path.display().to_string(), source })
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    struct FixedRefresher;

    #[async_trait]
    impl OAuthRefresher for FixedRefresher {
        async fn refresh(&self, _provider: &str, _refresh_token: &str) -> std::result::Result<RefreshedOAuth, Box<dyn std::error::Error + Send + Sync>> {
            Ok(RefreshedOAuth { access: "new-access".into(), refresh: "new-refresh".into(), expires: Utc::now() + chrono::Duration::hours(1) })
        }
    }

    fn store_at(dir: &tempfile::TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("auth.json"))
    }

    #[tokio::test]
    async fn runtime_override_wins_over_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_at(&dir);
        store.store_api_key("anthropic", "sk-stored").expect("store");
        store.set_runtime_override("anthropic", "sk-override");

        assert_eq!(store.get_api_key("anthropic").await.expect("get"), "sk-override");
    }

    #[tokio::test]
    async fn stored_api_key_is_returned_directly() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_at(&dir);
        store.store_api_key("anthropic", "sk-stored").expect("store");
        assert_eq!(store.get_api_key("anthropic").await.expect("get"), "sk-stored");
    }

    #[tokio::test]
    async fn missing_key_falls_through_to_environment() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_at(&dir);
        // SAFETY: single-threaded test process for this variable
        unsafe { std::env::set_var("OPENAI_API_KEY", "sk-from-env") };
        assert_eq!(store.get_api_key("openai").await.expect("get"), "sk-from-env");
        unsafe { std::env::remove_var("OPENAI_API_KEY") };
    }

    #[tokio::test]
    async fn unexpired_oauth_token_is_returned_without_refreshing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_at(&dir);
        store
            .store_oauth(
                "anthropic",
                Credential::OAuth { access: "still-good".into(), refresh: "r".into(), expires: Utc::now() + chrono::Duration::hours(1), project_id: None },
            )
            .expect("store");
        assert_eq!(store.get_api_key("anthropic").await.expect("get"), "still-good");
    }

    #[tokio::test]
    async fn expired_oauth_token_is_refreshed_and_persisted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CredentialStoreBuilder::new(dir.path().join("auth.json")).with_refresher("anthropic", Arc::new(FixedRefresher)).build();
        store
            .store_oauth(
                "anthropic",
                Credential::OAuth { access: "stale".into(), refresh: "r".into(), expires: Utc::now() - chrono::Duration::seconds(1), project_id: None },
            )
            .expect("store");

        let token = store.get_api_key("anthropic").await.expect("get");
        assert_eq!(token, "new-access");

        // persisted: a fresh store over the same file sees the new token.
        let reopened = CredentialStore::new(store.path().to_path_buf());
        assert_eq!(reopened.get_api_key("anthropic").await.expect("get"), "new-access");
    }

    #[tokio::test]
    async fn oauth_token_carries_project_id_as_json_pair() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_at(&dir);
        store
            .store_oauth(
                "vertex",
                Credential::OAuth { access: "tok".into(), refresh: "r".into(), expires: Utc::now() + chrono::Duration::hours(1), project_id: Some("proj-1".into()) },
            )
            .expect("store");
        let value = store.get_api_key("vertex").await.expect("get");
        let parsed: serde_json::Value = serde_json::from_str(&value).expect("json");
        assert_eq!(parsed["token"], "tok");
        assert_eq!(parsed["projectId"], "proj-1");
    }

    #[tokio::test]
    async fn unknown_provider_with_no_fallback_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_at(&dir);
        assert!(store.get_api_key("made-up-provider-xyz").await.is_err());
    }
}
