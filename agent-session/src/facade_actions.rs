//! [`FacadeHandle`]: the `Arc<Mutex<AgentSession>>` wrapper an extension's
//! `FacadeActions` implementation is built on. Kept in this crate, not `kestrel-extensions`, since
//! it needs to know the concrete `AgentSession` type the trait only sees through its three methods.

use std::sync::Arc;

use async_trait::async_trait;
use kestrel_extensions::FacadeActions;
use kestrel_protocol::tool::SteeringMode;
use tokio::sync::Mutex;

use crate::facade::AgentSession;

#[derive(Clone)]
pub struct FacadeHandle(pub Arc<Mutex<AgentSession>>);

impl FacadeHandle {
    pub fn new(session: AgentSession) -> Self {
        FacadeHandle(Arc::new(Mutex::new(session)))
    }
}

#[async_trait]
impl FacadeActions for FacadeHandle {
    async fn send_user_message(&self, text: String) {
        let mut session = self.0.lock().await;
        let _ = session.send_user_message(text, SteeringMode::FollowUp).await;
    }

    async fn append_custom_entry(&self, custom_type: String, data: serde_json::Value) {
        let mut session = self.0.lock().await;
        let _ = session.append_custom_entry(custom_type, data).await;
    }

    async fn exec_subprocess(&self, command: String, args: Vec<String>) -> std::result::Result<(String, i32), String> {
        let full_command = if args.is_empty() { command } else { format!("{command} {}", args.join(" ")) };
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let exit_code = {
            let mut session = self.0.lock().await;
            session.execute_bash(full_command, true, tx).await.map_err(|source| source.to_string())?
        };
        let mut output = String::new();
        while let Ok(line) = rx.try_recv() {
            output.push_str(&line);
            output.push('\n');
        }
        Ok((output, exit_code))
    }

    /// Best-effort: a held lock (a turn actively running) means a stale
    /// empty answer rather than blocking the extension dispatch that
    /// called this. `active_tool_names` rarely changes mid-turn, so a
    /// miss here just means "ask again after this turn."
    fn active_tool_names(&self) -> Vec<String> {
        match self.0.try_lock() {
            Ok(session) => session.active_tool_names(),
            Err(_) => Vec::new(),
        }
    }
}
