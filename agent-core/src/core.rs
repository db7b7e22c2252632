//! The per-turn agent loop. One `AgentCore` owns one transcript and drives it forward one turn at a
//! time: stream an assistant message, dispatch any tool calls it contains, append the results,
//! repeat until the model stops asking for tools or the queue runs dry. Built around a builder
//! assembling the fixed configuration, an `mpsc` event channel the loop owns the sending half of,
//! and a `CancellationToken` threaded through every await point.

use std::collections::VecDeque;
use std::sync::Arc;

use kestrel_protocol::tool::ToolOutcome;
use kestrel_protocol::{ContentBlock, Message, Model, StopReason, Usage};
use kestrel_provider::{build_request, ProviderClient, RequestOptions, RetryConfig};
use kestrel_tools_api::{ToolContext, ToolRegistry};
use tokio::sync::mpsc;

use crate::control::AgentControl;
use crate::credentials::ApiKeyResolver;
use crate::error::AgentError;
use crate::events::AgentEvent;
use crate::hooks::{NoopHooks, ToolResultRewrite, TurnHooks};

struct QueuedMessage {
    text: String,
}

/// What a single turn (one assistant message, plus whatever tool calls it
/// contained) decided for the run loop.
enum TurnOutcome {
    /// The assistant asked for tools; they ran and the run continues
    /// without needing a new queued message.
    ToolUse,
    /// The assistant stopped for any other reason; the run loop should
    /// check the queue before deciding whether to end.
    NaturalEnd,
}

pub struct AgentCoreBuilder {
    model: Model,
    system_prompt: String,
    endpoint: String,
    tools: ToolRegistry,
    credentials: Arc<dyn ApiKeyResolver>,
    retry_config: RetryConfig,
    thinking_level: Option<u8>,
    session_id: String,
    hooks: Arc<dyn TurnHooks>,
}

impl AgentCoreBuilder {
    pub fn new(model: Model, endpoint: impl Into<String>, credentials: Arc<dyn ApiKeyResolver>) -> Self {
        AgentCoreBuilder {
            model,
            system_prompt: String::new(),
            endpoint: endpoint.into(),
            tools: ToolRegistry::new(),
            credentials,
            retry_config: RetryConfig::default(),
            thinking_level: None,
            session_id: uuid::Uuid::new_v4().to_string(),
            hooks: Arc::new(NoopHooks),
        }
    }

    pub fn hooks(mut self, hooks: Arc<dyn TurnHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn thinking_level(mut self, level: Option<u8>) -> Self {
        self.thinking_level = level;
        self
    }

    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = id.into();
        self
    }

    pub fn build(self) -> (AgentCore, mpsc::UnboundedReceiver<AgentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let core = AgentCore {
            model: self.model,
            system_prompt: self.system_prompt,
            endpoint: self.endpoint,
            tools: self.tools,
            credentials: self.credentials,
            retry_config: self.retry_config,
            thinking_level: self.thinking_level,
            session_id: self.session_id,
            messages: Vec::new(),
            control: AgentControl::new(),
            queue: VecDeque::new(),
            events: tx,
            hooks: self.hooks,
        };
        (core, rx)
    }
}

pub struct AgentCore {
    model: Model,
    system_prompt: String,
    endpoint: String,
    tools: ToolRegistry,
    credentials: Arc<dyn ApiKeyResolver>,
    retry_config: RetryConfig,
    thinking_level: Option<u8>,
    session_id: String,
    messages: Vec<Message>,
    control: AgentControl,
    queue: VecDeque<QueuedMessage>,
    events: mpsc::UnboundedSender<AgentEvent>,
    hooks: Arc<dyn TurnHooks>,
}

impl AgentCore {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn control(&self) -> AgentControl {
        self.control.clone()
    }

    /// Replaces the transcript outright, e.g. after loading a session or navigating the tree. Only
    /// valid between runs; callers should `wait_for_idle` first.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    pub fn set_thinking_level(&mut self, level: Option<u8>) {
        self.thinking_level = level;
    }

    pub fn set_tools(&mut self, tools: ToolRegistry) {
        self.tools = tools;
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    /// Interrupts the in-flight run at the next tool-call boundary.
    pub fn steer(&self, text: impl Into<String>) {
        self.control.steer(text);
    }

    /// Delivered once the current run reaches a natural end; ignored if a
    /// run never started (callers use `prompt` for that).
    pub fn follow_up(&mut self, text: impl Into<String>) {
        self.queue.push_back(QueuedMessage { text: text.into() });
    }

    /// Drains the internal follow-up queue and returns the text of every
    /// message it held, in FIFO order.
    pub fn clear_queue(&mut self) -> Vec<String> {
        self.queue.drain(..).map(|queued| queued.text).collect()
    }

    pub fn abort(&self) {
        self.control.abort();
    }

    pub async fn wait_for_idle(&self) {
        self.control.wait_for_idle().await;
    }

    /// Starts a run: enqueues `text` as the first turn's user message, then
    /// drives turns until the model stops asking for tools and the queue is
    /// empty.
    pub async fn prompt(&mut self, text: impl Into<String>) -> Result<(), AgentError> {
        self.queue.push_back(QueuedMessage { text: text.into() });
        self.run(false).await
    }

    /// Re-runs the turn for whichever user message is already the last
    /// entry in `messages()`, without queuing a new one. Used by a caller
    /// that wants to retry a turn that failed before any assistant message
    /// was appended — calling `prompt` again there would duplicate the user message. Precondition: the
    /// last message is a `Message::User` with no assistant reply yet; violating it just re-issues the
    /// request against whatever context is there.
    pub async fn retry_pending_turn(&mut self) -> Result<(), AgentError> {
        self.run(true).await
    }

    async fn run(&mut self, resume_existing: bool) -> Result<(), AgentError> {
        let cancel = self.control.begin_run().map_err(|()| AgentError::AlreadyRunning)?;
        let result = self.run_inner(cancel, resume_existing).await;
        self.control.end_run();
        result
    }

    async fn run_inner(&mut self, cancel: tokio_util::sync::CancellationToken, resume_existing: bool) -> Result<(), AgentError> {
        let _ = self.events.send(AgentEvent::AgentStart);

        let mut need_user_message = !resume_existing;
        loop {
            if need_user_message {
                match self.queue.pop_front() {
                    Some(queued) => self.emit_user_message(queued.text),
                    None => break,
                }
            }

            match self.run_turn(cancel.clone()).await {
                Ok(TurnOutcome::ToolUse) => need_user_message = false,
                Ok(TurnOutcome::NaturalEnd) => need_user_message = true,
                Err(err) => {
                    let _ = self.events.send(AgentEvent::AgentEnd { messages: self.messages.clone() });
                    return Err(err);
                }
            }
        }

        let _ = self.events.send(AgentEvent::AgentEnd { messages: self.messages.clone() });
        Ok(())
    }

    fn emit_user_message(&mut self, text: String) {
        let message = Message::user_text(text);
        self.messages.push(message.clone());
        let _ = self.events.send(AgentEvent::MessageStart { message: message.clone() });
        let _ = self.events.send(AgentEvent::MessageEnd { message });
    }

    /// One assistant message, from request construction through tool
    /// dispatch.
    #[allow(clippy::expect_used)]
    async fn run_turn(&mut self, cancel: tokio_util::sync::CancellationToken) -> Result<TurnOutcome, AgentError> {
        let api_key = self
            .credentials
            .resolve(&self.model.provider)
            .await
            .map_err(|e| AgentError::CredentialResolution(self.model.provider.clone(), e.to_string()))?;

        let options = RequestOptions { thinking_level: self.thinking_level, ..RequestOptions::default() };
        let context_messages = self.hooks.before_context(self.messages.clone()).await;
        let request = build_request(&self.model, &context_messages, &self.system_prompt, &self.tools.specs(), &options);

        let assistant_message = self.stream_turn(&api_key, &request, cancel.clone()).await?;
        let outcome = if assistant_message.stop_reason == StopReason::ToolUse { TurnOutcome::ToolUse } else { TurnOutcome::NaturalEnd };

        self.messages.push(Message::Assistant {
            content: assistant_message.content,
            usage: assistant_message.usage,
            stop_reason: assistant_message.stop_reason,
            error_message: assistant_message.error_message,
            provider: self.model.provider.clone(),
            model_id: self.model.id.clone(),
            timestamp: assistant_message.timestamp,
        });
        let last = self.messages.last().expect("just pushed").clone();
        let _ = self.events.send(AgentEvent::MessageEnd { message: last });

        if matches!(outcome, TurnOutcome::ToolUse) {
            let tool_calls: Vec<ContentBlock> = self.messages.last().expect("just pushed").tool_calls().into_iter().cloned().collect();
            self.dispatch_tools(tool_calls, cancel).await;
        }

        Ok(outcome)
    }

    /// Forwards provider stream events into `message_update`s, returning the
    /// finalized assistant message once the stream reaches `Done`/`Error`.
    async fn stream_turn(&mut self, api_key: &str, request: &kestrel_provider::ProviderRequest, cancel: tokio_util::sync::CancellationToken) -> Result<PartialAssistant, AgentError> {
        // A fresh client per turn: `ProviderClient` is just a `reqwest::Client`
        // handle (itself `Arc`-backed internally), cheap to build and
        // simplest to move into the spawned producer task below.
        let (tx, mut rx) = mpsc::unbounded_channel();
        let provider = ProviderClient::new();
        let endpoint = self.endpoint.clone();
        let api_key = api_key.to_string();
        let retry_config = self.retry_config.clone();
        let request = request.clone();
        let stream_cancel = cancel.clone();
        let handle = tokio::spawn(async move { provider.stream_completion(&endpoint, &api_key, &request, retry_config, stream_cancel, tx).await });

        let mut partial = PartialAssistant::new();
        let mut started = false;

        while let Some(event) = rx.recv().await {
            if !started {
                started = true;
                let _ = self.events.send(AgentEvent::MessageStart { message: partial.as_message(&self.model) });
            }
            let done = partial.apply(event);
            let _ = self.events.send(AgentEvent::MessageUpdate { message: partial.as_message(&self.model) });
            if done {
                break;
            }
        }

        // Drain any tail and reap the producer task; its own Result has
        // already been surfaced as a StreamEvent by the time we get here.
        let _ = handle.await;

        Ok(partial)
    }

    /// Runs each tool call in source order, stopping early (but keeping
    /// results already produced) if a steer arrives mid-dispatch.
    async fn dispatch_tools(&mut self, tool_calls: Vec<ContentBlock>, cancel: tokio_util::sync::CancellationToken) {
        let mut results = Vec::with_capacity(tool_calls.len());
        let mut steer_interrupted = None;

        for block in tool_calls {
            let ContentBlock::ToolCall { id, name, arguments_json, .. } = block else { continue };

            let _ = self.events.send(AgentEvent::ToolExecutionStart { id: id.clone(), name: name.clone(), args: arguments_json.clone() });

            let decision = self.hooks.before_tool_call(&name, &id, &arguments_json).await;
            let outcome = if decision.block {
                ToolOutcome::error(decision.reason.unwrap_or_else(|| "blocked by an extension".to_string()))
            } else {
                self.run_one_tool(&id, &name, arguments_json.clone(), cancel.clone()).await
            };

            let rewrite = self
                .hooks
                .after_tool_result(&name, &id, ToolResultRewrite { content: outcome.content, is_error: outcome.is_error, details: outcome.details })
                .await;
            let ToolResultRewrite { content, is_error, details } = rewrite;

            let final_outcome = ToolOutcome { content: content.clone(), is_error, details: details.clone() };
            let _ = self.events.send(AgentEvent::ToolExecutionEnd { id: id.clone(), result: final_outcome, is_error });

            results.push(Message::ToolResult { tool_call_id: id, tool_name: name, content, is_error, details });

            if let Some(text) = self.control.take_pending_steer() {
                steer_interrupted = Some(text);
                break;
            }
        }

        for message in &results {
            let _ = self.events.send(AgentEvent::MessageStart { message: message.clone() });
        }
        self.messages.extend(results.clone());
        for message in &results {
            let _ = self.events.send(AgentEvent::MessageEnd { message: message.clone() });
        }

        if let Some(text) = steer_interrupted {
            self.emit_user_message(text);
        }
    }

    async fn run_one_tool(&mut self, id: &str, name: &str, args: serde_json::Value, cancel: tokio_util::sync::CancellationToken) -> ToolOutcome {
        let Some(tool) = self.tools.get(name).cloned() else {
            return ToolOutcome::error(format!("unknown tool: {name}"));
        };

        let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();
        let ctx = ToolContext::new(id, self.session_id.clone(), std::env::current_dir().unwrap_or_default(), cancel, updates_tx);

        let events = self.events.clone();
        let id_owned = id.to_string();
        let forward = tokio::spawn(async move {
            while let Some(partial_result) = updates_rx.recv().await {
                let _ = events.send(AgentEvent::ToolExecutionUpdate { id: id_owned.clone(), partial_result });
            }
        });

        let outcome = match tool.execute(id, args, &ctx).await {
            Ok(outcome) => outcome,
            Err(err) => ToolOutcome::error(err.to_string()),
        };
        forward.abort();
        outcome
    }
}

/// An assistant message under construction, accumulated from
/// `StreamEvent`s as they arrive.
struct PartialAssistant {
    content: Vec<ContentBlock>,
    current_text: Option<String>,
    current_thinking: Option<(String, Option<String>)>,
    usage: Usage,
    stop_reason: StopReason,
    error_message: Option<String>,
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl PartialAssistant {
    fn new() -> Self {
        PartialAssistant {
            content: Vec::new(),
            current_text: None,
            current_thinking: None,
            usage: Usage::default(),
            stop_reason: StopReason::Stop,
            error_message: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Applies one decoded stream event, returning `true` once the message
    /// is final (a `Done` or `Error` was just applied).
    fn apply(&mut self, event: kestrel_provider::StreamEvent) -> bool {
        use kestrel_provider::StreamEvent;
        match event {
            StreamEvent::TextStart => self.current_text = Some(String::new()),
            StreamEvent::TextDelta { delta } => {
                self.current_text.get_or_insert_with(String::new).push_str(&delta);
            }
            StreamEvent::TextEnd => {
                if let Some(text) = self.current_text.take() {
                    self.content.push(ContentBlock::Text { text });
                }
            }
            StreamEvent::ThinkingStart => self.current_thinking = Some((String::new(), None)),
            StreamEvent::ThinkingDelta { delta } => {
                let (text, _) = self.current_thinking.get_or_insert_with(|| (String::new(), None));
                text.push_str(&delta);
            }
            StreamEvent::ThinkingEnd => {
                if let Some((text, signature)) = self.current_thinking.take() {
                    self.content.push(ContentBlock::Thinking { text, opaque_signature: signature });
                }
            }
            StreamEvent::ToolCallStart { .. } | StreamEvent::ToolCallDelta { .. } => {}
            StreamEvent::ToolCallEnd { tool_call } => self.content.push(tool_call),
            StreamEvent::Usage { usage } => self.usage.accumulate(&usage),
            StreamEvent::Done { reason } => {
                self.stop_reason = reason;
                return true;
            }
            StreamEvent::Error { reason, message } => {
                self.stop_reason = if reason == "aborted" { StopReason::Aborted } else { StopReason::Error };
                self.error_message = Some(message);
                return true;
            }
        }
        false
    }

    fn as_message(&self, model: &Model) -> Message {
        let mut content = self.content.clone();
        if let Some(text) = &self.current_text {
            content.push(ContentBlock::Text { text: text.clone() });
        }
        Message::Assistant {
            content,
            usage: self.usage,
            stop_reason: self.stop_reason,
            error_message: self.error_message.clone(),
            provider: model.provider.clone(),
            model_id: model.id.clone(),
            timestamp: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::sync::Arc;

    use kestrel_protocol::{Pricing, StopReason};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::credentials::StaticApiKey;

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

    #[tokio::test]
    async fn prompt_appends_user_and_assistant_messages_from_a_plain_text_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(plain_text_sse("hi there"), "text/event-stream"))
            .mount(&server)
            .await;

        let endpoint = format!("{}/v1/messages", server.uri());
        let (mut core, _rx) = AgentCoreBuilder::new(model(), endpoint, Arc::new(StaticApiKey("key".into()))).build();

        core.prompt("hello").await.expect("prompt succeeds");

        assert_eq!(core.messages().len(), 2);
        match &core.messages()[1] {
            Message::Assistant { content, stop_reason, .. } => {
                assert_eq!(*stop_reason, StopReason::Stop);
                assert!(matches!(&content[0], ContentBlock::Text { text } if text == "hi there"));
            }
            other => panic!("expected assistant message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reentrant_prompt_while_running_is_rejected() {
        let control = AgentControl::new();
        let _held = control.begin_run().expect("first run starts");
        assert!(control.begin_run().is_err());
    }

    #[tokio::test]
    async fn follow_up_queues_without_starting_a_run() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(plain_text_sse("ok"), "text/event-stream"))
            .mount(&server)
            .await;
        let endpoint = format!("{}/v1/messages", server.uri());
        let (mut core, _rx) = AgentCoreBuilder::new(model(), endpoint, Arc::new(StaticApiKey("key".into()))).build();

        core.follow_up("queued for later");
        assert!(core.messages().is_empty());
        assert!(!core.control().is_running());
    }
}
