//! The seam between an extension and the facade that hosts it. Mirrors the `ApiKeyResolver` seam in
//! `kestrel-agent-core`: this crate only depends on the trait, never on `kestrel-agent-session`
//! itself, so extensions can't reach back into the facade's internals, only its published actions.

use async_trait::async_trait;

#[async_trait]
pub trait FacadeActions: Send + Sync {
    /// Submits `text` the way a typed-and-submitted user message would be
    /// (subject to the current steering mode).
    async fn send_user_message(&self, text: String);

    /// Appends a `CustomEntry` to the session log without sending anything
    /// to the LLM.
    async fn append_custom_entry(&self, custom_type: String, data: serde_json::Value);

    /// Runs `command` to completion and returns its combined output and
    /// exit code. Errors are spawn failures (command not found, etc.), not
    /// a non-zero exit.
    async fn exec_subprocess(&self, command: String, args: Vec<String>) -> Result<(String, i32), String>;

    /// Names of tools currently registered on the active agent instance.
    fn active_tool_names(&self) -> Vec<String>;
}
