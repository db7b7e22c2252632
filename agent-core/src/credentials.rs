//! The seam between `kestrel-agent-core` and wherever API keys actually
//! live. `kestrel-credentials` supplies the real implementation; this crate
//! only depends on the trait so it never needs to know about keyring files,
//! OAuth refresh, or environment variables.

use async_trait::async_trait;

use crate::error::AgentError;

#[async_trait]
pub trait ApiKeyResolver: Send + Sync {
    async fn resolve(&self, provider: &str) -> Result<String, AgentError>;
}

/// Resolves from a single fixed key, for tests and simple embeddings that
/// don't need the full credential store.
pub struct StaticApiKey(pub String);

#[async_trait]
impl ApiKeyResolver for StaticApiKey {
    async fn resolve(&self, _provider: &str) -> Result<String, AgentError> {
        Ok(self.0.clone())
    }
}
