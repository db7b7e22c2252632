//! [`AgentSession`]: the facade a UI holds. Composes an `AgentCore` with the session tree, the
//! credential store, and the extension runtime, and reconciles the three submission queues
//! (`steering`, `followUp`, `nextTurn`) against `AgentCore`'s simpler
//! single-slot-steer-plus-internal-queue primitives.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use kestrel_agent_core::hooks::TurnHooks;
use kestrel_agent_core::{ApiKeyResolver, AgentCore, AgentCoreBuilder, AgentError, AgentEvent};
use kestrel_credentials::CredentialStore;
use kestrel_extensions::{
    AgentPhaseEvent, BeforeAgentStartEvent, BeforeCompactEvent, BeforeTargetEvent, BeforeTreeEvent, ExtensionRuntime,
    SessionLifecycleEvent,
};
use kestrel_protocol::session_entry::EntryId;
use kestrel_protocol::tool::SteeringMode;
use kestrel_protocol::{Message, Model, StopReason, Usage};
use kestrel_provider::RetryConfig;
use kestrel_session::Session;
use kestrel_tools_api::ToolRegistry;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::compaction::{build_preparation_text, should_compact_proactively};
use crate::error::{AgentSessionError, Result};
use crate::events::{CompactionOutcome, CompactionReason, SessionEvent};
use crate::extension_hooks::ExtensionHooks;
use crate::system_prompt::{rebuild_system_prompt, SystemPromptInputs};
use crate::turn_policy::{backoff_delay, looks_like_context_overflow, looks_transient};

pub struct AgentSessionBuilder {
    model: Model,
    endpoint: String,
    credentials: Arc<CredentialStore>,
    tools: ToolRegistry,
    extensions: Arc<ExtensionRuntime>,
    session_path: PathBuf,
    compaction_threshold: f32,
    retry_config: RetryConfig,
    system_prompt_inputs: SystemPromptInputs,
    thinking_level: Option<u8>,
}

impl AgentSessionBuilder {
    pub fn new(model: Model, endpoint: impl Into<String>, credentials: Arc<CredentialStore>, session_path: PathBuf) -> Self {
        AgentSessionBuilder {
            model,
            endpoint: endpoint.into(),
            credentials,
            tools: ToolRegistry::new(),
            extensions: Arc::new(ExtensionRuntime::load(Vec::new())),
            session_path,
            compaction_threshold: 0.8,
            retry_config: RetryConfig::default(),
            system_prompt_inputs: SystemPromptInputs::default(),
            thinking_level: None,
        }
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn extensions(mut self, extensions: Arc<ExtensionRuntime>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn compaction_threshold(mut self, threshold: f32) -> Self {
        self.compaction_threshold = threshold;
        self
    }

    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn system_prompt_inputs(mut self, inputs: SystemPromptInputs) -> Self {
        self.system_prompt_inputs = inputs;
        self
    }

    pub fn thinking_level(mut self, level: Option<u8>) -> Self {
        self.thinking_level = level;
        self
    }

    pub async fn build(self) -> Result<(AgentSession, mpsc::UnboundedReceiver<SessionEvent>)> {
        let session = Session::load(self.session_path)?;

        let hooks: Arc<dyn TurnHooks> = Arc::new(ExtensionHooks { extensions: self.extensions.clone() });
        let system_prompt = rebuild_system_prompt(&self.system_prompt_inputs);
        let (mut core, core_events_rx) = AgentCoreBuilder::new(self.model.clone(), self.endpoint.clone(), self.credentials.clone() as Arc<dyn ApiKeyResolver>)
            .tools(self.tools)
            .retry_config(self.retry_config.clone())
            .system_prompt(system_prompt)
            .thinking_level(self.thinking_level)
            .hooks(hooks)
            .build();
        core.replace_messages(session.session_context());

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let facade = AgentSession {
            model: self.model,
            endpoint: self.endpoint,
            credentials: self.credentials,
            core,
            core_events_rx,
            session,
            extensions: self.extensions,
            compaction_threshold: self.compaction_threshold,
            retry_config: self.retry_config,
            system_prompt_inputs: self.system_prompt_inputs,
            steering_queue: VecDeque::new(),
            next_turn_queue: VecDeque::new(),
            compacting: false,
            compaction_queue: VecDeque::new(),
            last_known_usage: None,
            events: events_tx,
        };

        facade
            .extensions
            .dispatch_session_start(&SessionLifecycleEvent { session_id: facade.session_id(), detail: serde_json::json!({}) })
            .await;

        Ok((facade, events_rx))
    }
}

enum TurnStart {
    Fresh(String),
    Resume,
}

#[derive(Debug, Clone)]
pub struct SessionStats {
    pub entry_count: usize,
    pub last_known_usage: Option<Usage>,
    pub context_window: u32,
}

/// Return value of [`AgentSession::clear_queue`]: every message drained out
/// of the three submission queues, in FIFO order within each.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClearedQueues {
    pub steering: Vec<String>,
    pub follow_up: Vec<String>,
    pub next_turn: Vec<String>,
}

pub struct AgentSession {
    model: Model,
    endpoint: String,
    credentials: Arc<CredentialStore>,
    core: AgentCore,
    core_events_rx: mpsc::UnboundedReceiver<AgentEvent>,
    session: Session,
    extensions: Arc<ExtensionRuntime>,
    compaction_threshold: f32,
    retry_config: RetryConfig,
    system_prompt_inputs: SystemPromptInputs,
    steering_queue: VecDeque<String>,
    next_turn_queue: VecDeque<String>,
    compacting: bool,
    compaction_queue: VecDeque<(String, SteeringMode)>,
    last_known_usage: Option<Usage>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl AgentSession {
    fn session_id(&self) -> String {
        self.session.path().display().to_string()
    }

    pub fn active_tool_names(&self) -> Vec<String> {
        self.system_prompt_inputs.active_tool_names.clone()
    }

    /// The current branch's messages, in provider order — what a UI renders
    /// as the transcript. Borrowed, not cloned: callers redraw from this on
    /// every `SessionEvent`, so a clone per frame would be wasteful.
    pub fn messages(&self) -> &[Message] {
        self.core.messages()
    }

    pub fn is_running(&self) -> bool {
        self.core.control().is_running()
    }

    /// The loaded extension runtime, for a UI that needs to look up
    /// `/command` dispatch or a non-reserved shortcut binding itself rather
    /// than going through [`kestrel_extensions::FacadeActions`].
    pub fn extensions(&self) -> &Arc<ExtensionRuntime> {
        &self.extensions
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Switches the active model for both the live `AgentCore` and this
    /// facade's own copy (used for `context_window` in `get_session_stats`
    /// and the proactive-compaction threshold check).
    pub fn set_model(&mut self, model: Model) {
        self.model = model.clone();
        self.core.set_model(model);
    }

    /// Allowed any time; takes effect for the next provider call.
    pub fn set_thinking_level(&mut self, level: Option<u8>) {
        self.core.set_thinking_level(level);
    }

    /// Cancels the in-flight turn, if any.
    pub fn abort(&self) {
        self.core.abort();
    }

    /// Swaps the active tool set and rebuilds the system prompt to reflect
    /// it.
    pub fn set_tools(&mut self, tools: ToolRegistry, active_tool_names: Vec<String>) {
        self.system_prompt_inputs.active_tool_names = active_tool_names;
        self.core.set_system_prompt(rebuild_system_prompt(&self.system_prompt_inputs));
        self.core.set_tools(tools);
    }

    /// Drains all three submission queues and returns what each held.
    /// Nothing currently in flight is affected — only messages waiting to
    /// be delivered.
    pub fn clear_queue(&mut self) -> ClearedQueues {
        ClearedQueues {
            steering: self.steering_queue.drain(..).collect(),
            follow_up: self.core.clear_queue(),
            next_turn: self.next_turn_queue.drain(..).collect(),
        }
    }

    pub fn get_session_stats(&self) -> SessionStats {
        SessionStats {
            entry_count: self.session.entries_on_current_path().len(),
            last_known_usage: self.last_known_usage,
            context_window: self.model.context_window,
        }
    }

    pub fn get_user_messages_for_branching(&self) -> Vec<EntryId> {
        self.session.user_message_entries_for_branching().into_iter().map(|entry| entry.entry_id).collect()
    }

    /// Out of scope for this build (HTML export is an explicit non-goal);
    /// kept as a real method so callers get a typed error instead of a
    /// missing API surface.
    pub fn export_to_html(&self) -> Result<String> {
        Err(AgentSessionError::ExportToHtmlUnsupported)
    }

    pub async fn shutdown(&mut self) {
        self.extensions
            .dispatch_session_shutdown(&SessionLifecycleEvent { session_id: self.session_id(), detail: serde_json::json!({}) })
            .await;
    }

    pub async fn append_custom_entry(&mut self, custom_type: String, data: serde_json::Value) -> Result<()> {
        self.session.append_custom(custom_type, data)?;
        Ok(())
    }

    pub async fn send_custom_message(&mut self, custom_type: String, data: serde_json::Value, display: String, details: Option<serde_json::Value>) -> Result<()> {
        self.session.append_message(Message::Custom { custom_type, content: data, display, details })?;
        self.core.replace_messages(self.session.session_context());
        Ok(())
    }

    pub async fn new_session(&mut self, path: PathBuf) -> Result<()> {
        self.core.wait_for_idle().await;
        self.session = Session::create(path)?;
        self.core.replace_messages(self.session.session_context());
        self.last_known_usage = None;
        self.extensions
            .dispatch_session_start(&SessionLifecycleEvent { session_id: self.session_id(), detail: serde_json::json!({}) })
            .await;
        Ok(())
    }

    pub async fn switch_session(&mut self, path: PathBuf) -> Result<bool> {
        self.core.wait_for_idle().await;
        let target = path.display().to_string();
        let decision = self.extensions.dispatch_before_switch(&BeforeTargetEvent { target: target.clone() }).await;
        if decision.cancel {
            return Ok(false);
        }
        self.session = Session::load(path)?;
        self.core.replace_messages(self.session.session_context());
        self.last_known_usage = None;
        self.extensions
            .dispatch_session_switch(&SessionLifecycleEvent { session_id: self.session_id(), detail: serde_json::json!({ "target": target }) })
            .await;
        Ok(true)
    }

    /// Silent jump to `entry_id` and the narrated variant (`navigateTree`) share the same before/after
    /// events — the only difference is whether a `BranchSummary` entry is left behind.
    pub async fn branch(&mut self, entry_id: EntryId) -> Result<bool> {
        self.navigate_tree(entry_id, None).await
    }

    pub async fn navigate_tree(&mut self, entry_id: EntryId, summary: Option<(String, Option<serde_json::Value>)>) -> Result<bool> {
        self.core.wait_for_idle().await;
        let decision = self.extensions.dispatch_before_branch(&BeforeTargetEvent { target: entry_id.to_string() }).await;
        if decision.cancel {
            return Ok(false);
        }
        self.session.navigate_tree(entry_id, summary)?;
        self.core.replace_messages(self.session.session_context());
        self.last_known_usage = None;
        self.extensions
            .dispatch_session_branch(&SessionLifecycleEvent { session_id: self.session_id(), detail: serde_json::json!({ "entryId": entry_id.to_string() }) })
            .await;
        Ok(true)
    }

    /// A human-readable rendering of the current branch, gated the same
    /// way as compaction (an extension may supply its own summary and skip
    /// the preparation entirely).
    pub async fn tree_overview(&mut self) -> Result<String> {
        let preparation = build_preparation_text(&self.session.entries_on_current_path(), None);
        let signal = CancellationToken::new();
        let decision = self.extensions.dispatch_before_tree(&BeforeTreeEvent { preparation: preparation.clone(), signal }).await;
        let summary = decision.summary.unwrap_or(preparation);
        self.extensions
            .dispatch_session_tree(&SessionLifecycleEvent { session_id: self.session_id(), detail: serde_json::json!({}) })
            .await;
        Ok(summary)
    }

    pub async fn compact(&mut self, custom_instructions: Option<String>) -> Result<()> {
        self.core.wait_for_idle().await;
        self.run_compaction(custom_instructions, CompactionOutcome::Result).await
    }

    /// Runs `command` under `bash -lc`, streaming stdout lines through
    /// `on_chunk` as they arrive, then appending a `BashExecution` entry.
    /// `exclude_from_context` keeps the entry on disk but out of the
    /// LLM-visible transcript.
    pub async fn execute_bash(&mut self, command: String, exclude_from_context: bool, on_chunk: mpsc::UnboundedSender<String>) -> Result<i32> {
        let mut child = tokio::process::Command::new("bash")
            .arg("-lc")
            .arg(&command)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|source| AgentSessionError::SubprocessSpawn(source.to_string()))?;

        let mut output = String::new();
        if let Some(stdout) = child.stdout.take() {
            let mut lines = tokio::io::BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = on_chunk.send(line.clone());
                output.push_str(&line);
                output.push('\n');
            }
        }

        let status = child.wait().await.map_err(|source| AgentSessionError::SubprocessSpawn(source.to_string()))?;
        let exit_code = status.code().unwrap_or(-1);

        self.session.append_message(Message::BashExecution { command, output, exit_code, excluded_from_context: exclude_from_context })?;
        if !exclude_from_context {
            self.core.replace_messages(self.session.session_context());
        }
        Ok(exit_code)
    }

    /// Submits `text` `prompt`: dispatched on the current steering mode. `NextTurn` never starts a turn
    /// itself — it's flushed ahead of whatever the next `Steer`/`FollowUp` send is. While a compaction is
    /// in flight, every submission is held in `compaction_queue` instead and replayed (preserving its
    /// mode) once the compaction ends.
    pub async fn send_user_message(&mut self, text: String, mode: SteeringMode) -> Result<()> {
        if self.compacting {
            self.compaction_queue.push_back((text, mode));
            return Ok(());
        }
        match mode {
            SteeringMode::NextTurn => {
                self.next_turn_queue.push_back(text);
                Ok(())
            }
            SteeringMode::Steer if self.core.control().is_running() => {
                self.steering_queue.push_back(text);
                Ok(())
            }
            SteeringMode::FollowUp if self.core.control().is_running() => {
                self.core.follow_up(text);
                Ok(())
            }
            _ => {
                self.flush_next_turn_queue().await?;
                self.start_turn(text).await
            }
        }
    }

    async fn flush_next_turn_queue(&mut self) -> Result<()> {
        while let Some(queued) = self.next_turn_queue.pop_front() {
            self.start_turn(queued).await?;
        }
        Ok(())
    }

    /// Drives one user message to completion: `before_agent_start`,
    /// the turn itself (with its steering pump), then auto-retry and
    /// auto-compaction as needed.
    async fn start_turn(&mut self, text: String) -> Result<()> {
        let aggregate = self
            .extensions
            .dispatch_before_agent_start(&BeforeAgentStartEvent { prompt: text.clone(), images: Vec::new() })
            .await;

        for prepended in &aggregate.prepended_messages {
            self.session.append_message(Message::user_text(prepended.clone()))?;
        }
        if !aggregate.prepended_messages.is_empty() {
            self.core.replace_messages(self.session.session_context());
        }

        let base_system_prompt = rebuild_system_prompt(&self.system_prompt_inputs);
        if let Some(append) = &aggregate.system_prompt_append {
            self.core.set_system_prompt(format!("{base_system_prompt}\n\n{append}"));
        }

        let result = self.run_turn_with_retry(text).await;

        if aggregate.system_prompt_append.is_some() {
            self.core.set_system_prompt(base_system_prompt);
        }

        result
    }

    async fn run_turn_with_retry(&mut self, text: String) -> Result<()> {
        self.run_one_cycle(TurnStart::Fresh(text)).await?;

        let mut attempt = 0u32;
        loop {
            let Some(failure) = self.last_turn_error() else {
                if attempt > 0 {
                    let _ = self.events.send(SessionEvent::AutoRetryEnd { success: true, final_error: None });
                }
                self.maybe_auto_compact_proactively().await?;
                return Ok(());
            };

            if looks_like_context_overflow(&failure) {
                let _ = self.events.send(SessionEvent::AutoCompactionStart { reason: CompactionReason::Reactive });
                self.run_compaction(None, CompactionOutcome::WillRetry).await?;
                self.run_one_cycle(TurnStart::Resume).await?;
                continue;
            }

            if looks_transient(&failure) && attempt < self.retry_config.max_retries {
                attempt += 1;
                let delay = backoff_delay(attempt, &self.retry_config);
                let _ = self.events.send(SessionEvent::AutoRetryStart { attempt, max_attempts: self.retry_config.max_retries, delay_ms: delay.as_millis() as u64 });
                tokio::time::sleep(delay).await;
                self.run_one_cycle(TurnStart::Resume).await?;
                continue;
            }

            if attempt > 0 {
                let _ = self.events.send(SessionEvent::AutoRetryEnd { success: false, final_error: Some(failure) });
            }
            return Ok(());
        }
    }

    fn last_turn_error(&self) -> Option<String> {
        match self.core.messages().last() {
            Some(Message::Assistant { stop_reason: StopReason::Error, error_message, .. }) => {
                Some(error_message.clone().unwrap_or_else(|| "unknown provider error".to_string()))
            }
            _ => None,
        }
    }

    /// Runs `start` to completion, pumping `AgentCore`'s event channel
    /// concurrently: every event is republished as a `SessionEvent`, the
    /// last assistant `Usage` is remembered for proactive compaction, and
    /// a queued steer is delivered at the next tool-call boundary — this
    /// is what reproduces FIFO multi-steer delivery on top of
    /// `AgentControl`'s single steer slot.
    async fn run_one_cycle(&mut self, start: TurnStart) -> Result<()> {
        let control = self.core.control();
        let extensions = self.extensions.clone();
        let events_tx = self.events.clone();
        let core_events_rx = &mut self.core_events_rx;
        let steering_queue = &mut self.steering_queue;
        let last_known_usage = &mut self.last_known_usage;

        let pump = async move {
            while let Some(event) = core_events_rx.recv().await {
                match &event {
                    AgentEvent::AgentStart => {
                        extensions.dispatch_agent_start(&AgentPhaseEvent { phase: "agent_start", detail: serde_json::json!({}) }).await;
                    }
                    AgentEvent::AgentEnd { .. } => {
                        extensions.dispatch_agent_end(&AgentPhaseEvent { phase: "agent_end", detail: serde_json::json!({}) }).await;
                    }
                    AgentEvent::MessageStart { message: Message::User { .. } } => {
                        extensions.dispatch_turn_start(&AgentPhaseEvent { phase: "turn_start", detail: serde_json::json!({}) }).await;
                    }
                    AgentEvent::MessageEnd { message: Message::Assistant { usage, stop_reason, .. } } => {
                        *last_known_usage = Some(*usage);
                        if *stop_reason != StopReason::ToolUse {
                            extensions.dispatch_turn_end(&AgentPhaseEvent { phase: "turn_end", detail: serde_json::json!({}) }).await;
                        }
                    }
                    AgentEvent::ToolExecutionEnd { .. } => {
                        if let Some(next) = steering_queue.pop_front() {
                            control.steer(next);
                        }
                    }
                    _ => {}
                }
                let _ = events_tx.send(SessionEvent::Agent(event));
            }
        };

        let run: Pin<Box<dyn std::future::Future<Output = std::result::Result<(), AgentError>> + Send + '_>> = match start {
            TurnStart::Fresh(text) => Box::pin(self.core.prompt(text)),
            TurnStart::Resume => Box::pin(self.core.retry_pending_turn()),
        };

        let (run_result, ()) = tokio::join!(run, pump);
        run_result?;
        Ok(())
    }

    async fn maybe_auto_compact_proactively(&mut self) -> Result<()> {
        let Some(usage) = self.last_known_usage else { return Ok(()) };
        if should_compact_proactively(usage.total_tokens, self.model.context_window, self.compaction_threshold) {
            let _ = self.events.send(SessionEvent::AutoCompactionStart { reason: CompactionReason::Proactive });
            self.run_compaction(None, CompactionOutcome::Result).await?;
        }
        Ok(())
    }

    /// Wraps [`Self::run_compaction_inner`] with the `compacting` flag so
    /// `send_user_message` knows to queue rather than dispatch, and flushes
    /// that queue once the compaction has ended, success or not.
    async fn run_compaction(&mut self, custom_instructions: Option<String>, outcome_on_success: CompactionOutcome) -> Result<()> {
        self.compacting = true;
        let result = self.run_compaction_inner(custom_instructions, outcome_on_success).await;
        self.compacting = false;
        self.flush_compaction_queue().await?;
        result
    }

    async fn flush_compaction_queue(&mut self) -> Result<()> {
        while let Some((text, mode)) = self.compaction_queue.pop_front() {
            self.send_user_message(text, mode).await?;
        }
        Ok(())
    }

    #[allow(clippy::expect_used)]
    async fn run_compaction_inner(&mut self, custom_instructions: Option<String>, outcome_on_success: CompactionOutcome) -> Result<()> {
        let path = self.session.entries_on_current_path();
        if path.is_empty() {
            let _ = self.events.send(SessionEvent::AutoCompactionEnd { outcome: CompactionOutcome::Aborted });
            return Ok(());
        }

        let branch_entries: Vec<EntryId> = path.iter().map(|entry| entry.entry_id).collect();
        let preparation = build_preparation_text(&path, custom_instructions.as_deref());
        let signal = CancellationToken::new();

        let before_event = BeforeCompactEvent {
            preparation: preparation.clone(),
            branch_entries,
            custom_instructions: custom_instructions.clone(),
            signal: signal.clone(),
        };
        let decision = self.extensions.dispatch_before_compact(&before_event).await;
        if decision.cancel {
            let _ = self.events.send(SessionEvent::AutoCompactionEnd { outcome: CompactionOutcome::Aborted });
            return Ok(());
        }

        let summary = match decision.compaction {
            Some(summary) => summary,
            None => self.summarize_for_compaction(&preparation, signal).await?,
        };

        let first_kept = path
            .iter()
            .rev()
            .find(|entry| matches!(entry.as_message(), Some(Message::User { .. })))
            .map(|entry| entry.entry_id)
            .unwrap_or_else(|| path.last().expect("checked non-empty above").entry_id);
        let tokens_before = self.last_known_usage.map(|usage| usage.total_tokens).unwrap_or(0);

        self.session.record_compaction(summary, first_kept, tokens_before)?;
        self.core.replace_messages(self.session.session_context());
        self.last_known_usage = None;

        self.extensions
            .dispatch_session_compact(&SessionLifecycleEvent {
                session_id: self.session_id(),
                detail: serde_json::json!({ "firstKeptEntryId": first_kept.to_string(), "tokensBefore": tokens_before }),
            })
            .await;

        let _ = self.events.send(SessionEvent::AutoCompactionEnd { outcome: outcome_on_success });
        Ok(())
    }

    /// A one-off `AgentCore`, scoped to this call only, used purely to get
    /// a summarizing completion out of the same model/endpoint/credentials
    /// the real session uses. Its transcript is discarded once the summary
    /// text is extracted.
    async fn summarize_for_compaction(&self, preparation: &str, signal: CancellationToken) -> Result<String> {
        let (mut ephemeral, _rx) = AgentCoreBuilder::new(self.model.clone(), self.endpoint.clone(), self.credentials.clone() as Arc<dyn ApiKeyResolver>)
            .system_prompt("Summarize this conversation so it can seed a continuation. Preserve decisions, open threads, and concrete facts; omit pleasantries.")
            .retry_config(self.retry_config.clone())
            .build();

        tokio::select! {
            result = ephemeral.prompt(preparation.to_string()) => {
                result?;
            }
            () = signal.cancelled() => {
                ephemeral.abort();
                return Ok(String::new());
            }
        }

        let summary = ephemeral
            .messages()
            .iter()
            .rev()
            .find_map(|message| match message {
                Message::Assistant { content, .. } => content.iter().find_map(|block| match block {
                    kestrel_protocol::ContentBlock::Text { text } => Some(text.clone()),
                    _ => None,
                }),
                _ => None,
            })
            .unwrap_or_default();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use kestrel_protocol::Pricing;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn model() -> Model {
        Model { provider: "anthropic".into(), id: "claude".into(), name: "Claude".into(), context_window: 200_000, reasoning: false, supports_x_high: false, pricing: Pricing::default() }
    }

    fn plain_text_sse(text: &str) -> String {
        format!(
            "data: {{\"type\":\"message_start\"}}\n\n\
             data: {{\"type\":\"content_block_start\",\"index\":0,\"content_block\":{{\"type\":\"text\",\"text\":\"\"}}}}\n\n\
             data: {{\"type\":\"content_block_delta\",\"index\":0,\"delta\":{{\"type\":\"text_delta\",\"text\":\"{text}\"}}}}\n\n\
             data: {{\"type\":\"content_block_stop\",\"index\":0}}\n\n\
             data: {{\"type\":\"message_delta\",\"delta\":{{\"stop_reason\":\"end_turn\"}},\"usage\":{{\"input_tokens\":10,\"output_tokens\":2,\"cache_read_input_tokens\":0,\"cache_creation_input_tokens\":0,\"thoughts_tokens\":0}}}}\n\n\
             data: {{\"type\":\"message_stop\"}}\n\n"
        )
    }

    async fn session_at(dir: &tempfile::TempDir, endpoint: impl Into<String>) -> AgentSession {
        let credentials = Arc::new(CredentialStore::new(dir.path().join("auth.json")));
        credentials.store_api_key("anthropic", "test-key").expect("store key");
        let (session, _rx) = AgentSessionBuilder::new(model(), endpoint.into(), credentials, dir.path().join("session.jsonl"))
            .build()
            .await
            .expect("build");
        session
    }

    #[tokio::test]
    async fn clear_queue_drains_all_three_queues_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session_at(&dir, "http://127.0.0.1:0").await;

        session.steering_queue.push_back("steer-1".into());
        session.steering_queue.push_back("steer-2".into());
        session.next_turn_queue.push_back("next-1".into());
        session.core.follow_up("follow-1");

        let cleared = session.clear_queue();
        assert_eq!(cleared.steering, vec!["steer-1".to_string(), "steer-2".to_string()]);
        assert_eq!(cleared.follow_up, vec!["follow-1".to_string()]);
        assert_eq!(cleared.next_turn, vec!["next-1".to_string()]);

        assert_eq!(session.clear_queue(), ClearedQueues::default());
    }

    #[tokio::test]
    async fn messages_submitted_while_compacting_are_queued_then_flushed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(plain_text_sse("hi"), "text/event-stream"))
            .mount(&server)
            .await;
        let endpoint = format!("{}/v1/messages", server.uri());
        let mut session = session_at(&dir, endpoint).await;

        session.compacting = true;
        session.send_user_message("queued while compacting".into(), SteeringMode::FollowUp).await.expect("send");

        assert_eq!(session.compaction_queue.len(), 1);
        assert!(session.core.messages().is_empty(), "compacting submission must not start a turn early");

        session.compacting = false;
        session.flush_compaction_queue().await.expect("flush");

        assert!(session.compaction_queue.is_empty());
        assert_eq!(session.core.messages().len(), 2, "flushed message should have started and completed a turn");
    }
}
