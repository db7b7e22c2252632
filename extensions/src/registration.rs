//! Registrable primitives.

use std::sync::Arc;

use async_trait::async_trait;
use kestrel_keys::KeyId;
use kestrel_tools_api::tool::RenderHint;

use crate::facade::FacadeActions;

/// A `/name` slash command.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn run(&self, args: &str, facade: &dyn FacadeActions);
}

/// A non-reserved keyboard shortcut.
#[async_trait]
pub trait Shortcut: Send + Sync {
    fn description(&self) -> &str;
    async fn run(&self, facade: &dyn FacadeActions);
}

/// A CLI flag descriptor. Parsing itself is out of scope; this is just
/// enough for a help listing and for `kestrel-cli` to recognize the name.
#[derive(Debug, Clone)]
pub struct FlagDef {
    pub name: String,
    pub description: String,
    pub takes_value: bool,
}

/// Renders a `Custom` message's opaque `content` for display.
pub trait MessageRenderer: Send + Sync {
    fn render(&self, content: &serde_json::Value) -> RenderHint;
}

/// Accumulates everything one extension's `register` call contributes.
/// `ExtensionRuntime::load` merges these across extensions in load order,
/// so "last-registered wins" for conflicting names/shortcuts falls out of
/// plain `HashMap::insert`.
#[derive(Default)]
pub struct Registrar {
    pub(crate) tools: Vec<Arc<dyn kestrel_tools_api::Tool>>,
    pub(crate) commands: Vec<Arc<dyn Command>>,
    pub(crate) shortcuts: Vec<(KeyId, Arc<dyn Shortcut>)>,
    pub(crate) flags: Vec<FlagDef>,
    pub(crate) message_renderers: Vec<(String, Arc<dyn MessageRenderer>)>,
}

impl Registrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tool(&mut self, tool: Arc<dyn kestrel_tools_api::Tool>) {
        self.tools.push(tool);
    }

    pub fn register_command(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    /// Rejects reserved ids outright; anything else is accepted and resolved last-registered-wins at
    /// merge time.
    pub fn register_shortcut(&mut self, id: KeyId, shortcut: Arc<dyn Shortcut>) {
        if kestrel_keys::is_reserved(&id) {
            tracing::warn!(shortcut = %id, "extension tried to register a reserved shortcut, ignoring");
            return;
        }
        self.shortcuts.push((id, shortcut));
    }

    pub fn register_flag(&mut self, flag: FlagDef) {
        self.flags.push(flag);
    }

    pub fn register_message_renderer(&mut self, custom_type: impl Into<String>, renderer: Arc<dyn MessageRenderer>) {
        self.message_renderers.push((custom_type.into(), renderer));
    }
}
