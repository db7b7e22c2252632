//! [`ExtensionRuntime`]: holds the loaded extensions in load order and
//! dispatches every event in the fixed event table, applying its
//! fold/cancel/block rules.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use kestrel_keys::KeyId;
use kestrel_protocol::Message;
use kestrel_tools_api::Tool;
use tracing::warn;

use crate::error_listener::{ErrorListener, TracingErrorListener};
use crate::event::*;
use crate::extension::ExtensionModule;
use crate::registration::{Command, MessageRenderer, Registrar, Shortcut};

/// The accumulated result of `before_agent_start` across every registered
/// handler.
#[derive(Debug, Clone, Default)]
pub struct BeforeAgentStartAggregate {
    /// Messages to prepend to the user's message, oldest first.
    pub prepended_messages: Vec<String>,
    pub system_prompt_append: Option<String>,
}

pub struct ExtensionRuntime {
    extensions: Vec<Arc<dyn ExtensionModule>>,
    tools: Vec<Arc<dyn Tool>>,
    commands: HashMap<String, Arc<dyn Command>>,
    shortcuts: HashMap<KeyId, Arc<dyn Shortcut>>,
    flags: Vec<crate::registration::FlagDef>,
    message_renderers: HashMap<String, Arc<dyn MessageRenderer>>,
    error_listener: Arc<dyn ErrorListener>,
}

impl ExtensionRuntime {
    pub fn load(extensions: Vec<Arc<dyn ExtensionModule>>) -> Self {
        Self::load_with_listener(extensions, Arc::new(TracingErrorListener))
    }

    /// Merges every extension's `register()` contribution in load order, so
    /// conflicting tool/command names and shortcut bindings resolve
    /// last-registered-wins.
    pub fn load_with_listener(extensions: Vec<Arc<dyn ExtensionModule>>, error_listener: Arc<dyn ErrorListener>) -> Self {
        let mut tools: HashMap<String, Arc<dyn Tool>> = HashMap::new();
        let mut commands: HashMap<String, Arc<dyn Command>> = HashMap::new();
        let mut shortcuts: HashMap<KeyId, Arc<dyn Shortcut>> = HashMap::new();
        let mut flags = Vec::new();
        let mut message_renderers: HashMap<String, Arc<dyn MessageRenderer>> = HashMap::new();

        for ext in &extensions {
            let mut registrar = Registrar::new();
            ext.register(&mut registrar);

            for tool in registrar.tools {
                tools.insert(tool.name().to_string(), tool);
            }
            for command in registrar.commands {
                if commands.contains_key(command.name()) {
                    warn!(command = command.name(), extension = ext.path(), "command name conflict, last registration wins");
                }
                commands.insert(command.name().to_string(), command);
            }
            for (id, shortcut) in registrar.shortcuts {
                if shortcuts.contains_key(&id) {
                    warn!(shortcut = %id, extension = ext.path(), "shortcut conflict, last registration wins");
                }
                shortcuts.insert(id, shortcut);
            }
            flags.extend(registrar.flags);
            for (custom_type, renderer) in registrar.message_renderers {
                message_renderers.insert(custom_type, renderer);
            }
        }

        ExtensionRuntime {
            extensions,
            tools: tools.into_values().collect(),
            commands,
            shortcuts,
            flags,
            message_renderers,
            error_listener,
        }
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn command(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.commands.get(name)
    }

    /// Every extension-registered command name, for a UI's command palette.
    pub fn command_names(&self) -> Vec<&str> {
        self.commands.keys().map(String::as_str).collect()
    }

    pub fn shortcut(&self, id: &KeyId) -> Option<&Arc<dyn Shortcut>> {
        self.shortcuts.get(id)
    }

    pub fn flags(&self) -> &[crate::registration::FlagDef] {
        &self.flags
    }

    pub fn message_renderer(&self, custom_type: &str) -> Option<&Arc<dyn MessageRenderer>> {
        self.message_renderers.get(custom_type)
    }

    /// Runs an observational (no-return) handler, catching a panic so one
    /// misbehaving extension can't take the turn down with it.
    async fn run_observer<F>(&self, path: &str, event: &str, fut: F)
    where
        F: std::future::Future<Output = ()>,
    {
        if AssertUnwindSafe(fut).catch_unwind().await.is_err() {
            self.error_listener.on_handler_error(path, event, "handler panicked");
        }
    }

    /// Runs a typed handler. Any `Err` (an explicit "throw") or panic is
    /// logged and replaced with `T::default`: a handler that throws on a
    /// non-`tool_call` event never alters the post-state of the turn.
    async fn run_or_default<T, F>(&self, path: &str, event: &str, fut: F) -> T
    where
        T: Default,
        F: std::future::Future<Output = Result<T, String>>,
    {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(value)) => value,
            Ok(Err(message)) => {
                self.error_listener.on_handler_error(path, event, &message);
                T::default()
            }
            Err(_) => {
                self.error_listener.on_handler_error(path, event, "handler panicked");
                T::default()
            }
        }
    }

    pub async fn dispatch_session_start(&self, event: &SessionLifecycleEvent) {
        for ext in &self.extensions {
            self.run_observer(ext.path(), "session_start", ext.on_session_start(event)).await;
        }
    }

    pub async fn dispatch_session_switch(&self, event: &SessionLifecycleEvent) {
        for ext in &self.extensions {
            self.run_observer(ext.path(), "session_switch", ext.on_session_switch(event)).await;
        }
    }

    pub async fn dispatch_session_branch(&self, event: &SessionLifecycleEvent) {
        for ext in &self.extensions {
            self.run_observer(ext.path(), "session_branch", ext.on_session_branch(event)).await;
        }
    }

    pub async fn dispatch_session_compact(&self, event: &SessionLifecycleEvent) {
        for ext in &self.extensions {
            self.run_observer(ext.path(), "session_compact", ext.on_session_compact(event)).await;
        }
    }

    pub async fn dispatch_session_shutdown(&self, event: &SessionLifecycleEvent) {
        for ext in &self.extensions {
            self.run_observer(ext.path(), "session_shutdown", ext.on_session_shutdown(event)).await;
        }
    }

    pub async fn dispatch_session_tree(&self, event: &SessionLifecycleEvent) {
        for ext in &self.extensions {
            self.run_observer(ext.path(), "session_tree", ext.on_session_tree(event)).await;
        }
    }

    /// First `cancel: true` wins and short-circuits the remaining handlers.
    pub async fn dispatch_before_switch(&self, event: &BeforeTargetEvent) -> CancelOutcome {
        for ext in &self.extensions {
            let outcome = self.run_or_default(ext.path(), "session_before_switch", ext.on_session_before_switch(event)).await;
            if outcome.cancel {
                return outcome;
            }
        }
        CancelOutcome::default()
    }

    pub async fn dispatch_before_branch(&self, event: &BeforeTargetEvent) -> CancelOutcome {
        for ext in &self.extensions {
            let outcome = self.run_or_default(ext.path(), "session_before_branch", ext.on_session_before_branch(event)).await;
            if outcome.cancel {
                return outcome;
            }
        }
        CancelOutcome::default()
    }

    pub async fn dispatch_before_compact(&self, event: &BeforeCompactEvent) -> BeforeCompactOutcome {
        for ext in &self.extensions {
            let outcome = self.run_or_default(ext.path(), "session_before_compact", ext.on_session_before_compact(event)).await;
            if outcome.cancel || outcome.compaction.is_some() {
                return outcome;
            }
        }
        BeforeCompactOutcome::default()
    }

    pub async fn dispatch_before_tree(&self, event: &BeforeTreeEvent) -> BeforeTreeOutcome {
        for ext in &self.extensions {
            let outcome = self.run_or_default(ext.path(), "session_before_tree", ext.on_session_before_tree(event)).await;
            if outcome.cancel || outcome.summary.is_some() {
                return outcome;
            }
        }
        BeforeTreeOutcome::default()
    }

    /// Messages accumulate oldest-first across handlers; system-prompt
    /// appends concatenate with a blank line between them.
    pub async fn dispatch_before_agent_start(&self, event: &BeforeAgentStartEvent) -> BeforeAgentStartAggregate {
        let mut prepended_messages = Vec::new();
        let mut appends = Vec::new();
        for ext in &self.extensions {
            let outcome = self.run_or_default(ext.path(), "before_agent_start", ext.on_before_agent_start(event)).await;
            if let Some(message) = outcome.message {
                prepended_messages.push(message);
            }
            if let Some(append) = outcome.system_prompt_append {
                appends.push(append);
            }
        }
        BeforeAgentStartAggregate {
            prepended_messages,
            system_prompt_append: if appends.is_empty() { None } else { Some(appends.join("\n\n")) },
        }
    }

    pub async fn dispatch_agent_start(&self, event: &AgentPhaseEvent) {
        for ext in &self.extensions {
            self.run_observer(ext.path(), "agent_start", ext.on_agent_start(event)).await;
        }
    }

    pub async fn dispatch_agent_end(&self, event: &AgentPhaseEvent) {
        for ext in &self.extensions {
            self.run_observer(ext.path(), "agent_end", ext.on_agent_end(event)).await;
        }
    }

    pub async fn dispatch_turn_start(&self, event: &AgentPhaseEvent) {
        for ext in &self.extensions {
            self.run_observer(ext.path(), "turn_start", ext.on_turn_start(event)).await;
        }
    }

    pub async fn dispatch_turn_end(&self, event: &AgentPhaseEvent) {
        for ext in &self.extensions {
            self.run_observer(ext.path(), "turn_end", ext.on_turn_end(event)).await;
        }
    }

    /// Last-writer-wins rewrite of the provider input. Returns `messages`
    /// unchanged if no handler rewrites it.
    pub async fn dispatch_context(&self, messages: Vec<Message>) -> Vec<Message> {
        let mut current = messages;
        for ext in &self.extensions {
            let event = ContextEvent { messages: current.clone() };
            if let Some(rewritten) = self.run_or_default(ext.path(), "context", ext.on_context(&event)).await {
                current = rewritten;
            }
        }
        current
    }

    /// `block=true` short-circuits; a handler that throws fails *safely*,
    /// blocking the tool with the thrown message rather than letting it run
    /// .
    pub async fn dispatch_tool_call(&self, event: &ToolCallEvent) -> ToolCallOutcome {
        for ext in &self.extensions {
            let outcome = match AssertUnwindSafe(ext.on_tool_call(event)).catch_unwind().await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(message)) => {
                    self.error_listener.on_handler_error(ext.path(), "tool_call", &message);
                    return ToolCallOutcome { block: true, reason: Some(message) };
                }
                Err(_) => {
                    self.error_listener.on_handler_error(ext.path(), "tool_call", "handler panicked");
                    return ToolCallOutcome { block: true, reason: Some("extension handler panicked".to_string()) };
                }
            };
            if outcome.block {
                return outcome;
            }
        }
        ToolCallOutcome::default()
    }

    /// Last-writer-wins mutation of the result surfaced back to the LLM,
    /// merged field-by-field so one handler can rewrite `content` while a
    /// later one only touches `details`.
    pub async fn dispatch_tool_result(&self, event: &ToolResultEvent) -> ToolResultOutcome {
        let mut merged = ToolResultOutcome::default();
        for ext in &self.extensions {
            let outcome = self.run_or_default(ext.path(), "tool_result", ext.on_tool_result(event)).await;
            if outcome.content.is_some() {
                merged.content = outcome.content;
            }
            if outcome.details.is_some() {
                merged.details = outcome.details;
            }
            if outcome.is_error.is_some() {
                merged.is_error = outcome.is_error;
            }
        }
        merged
    }
}
