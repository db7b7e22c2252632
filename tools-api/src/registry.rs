//! `tools: Map<name, Tool>`.

use std::collections::HashMap;
use std::sync::Arc;

use kestrel_protocol::tool::ToolSpec;

use crate::tool::Tool;

/// The set of tools available to an agent instance, keyed by wire name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `tool`, replacing any existing tool with the same name
    /// (the last registration wins — extensions registering a tool under a
    /// built-in's name shadow it).
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Specs for every registered tool, in the shape the provider adapter
    /// sends with each request.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .values()
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                label: tool.label().to_string(),
                description: tool.description().to_string(),
                parameter_schema: tool.parameter_schema(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ToolContext;
    use crate::error::ToolError;
    use async_trait::async_trait;

    struct NoopTool(&'static str);

    #[async_trait]
    impl Tool for NoopTool {
        fn name(&self) -> &str {
            self.0
        }
        fn label(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "noop"
        }
        fn parameter_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(
            &self,
            _id: &str,
            _args: serde_json::Value,
            _ctx: &ToolContext,
        ) -> Result<kestrel_protocol::tool::ToolOutcome, ToolError> {
            Ok(kestrel_protocol::tool::ToolOutcome::text(""))
        }
    }

    #[test]
    fn later_registration_shadows_earlier_one_with_same_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(NoopTool("read")));
        registry.register(Arc::new(NoopTool("read")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn specs_reflect_every_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(NoopTool("read")));
        registry.register(Arc::new(NoopTool("write")));
        let specs = registry.specs();
        assert_eq!(specs.len(), 2);
    }
}
