//! Model catalog types.

use serde::{Deserialize, Serialize};

/// Per-token pricing for a [`Model`], in hundredths of a cent per token so
/// running totals (see [`crate::message::Usage`]) stay integer arithmetic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub input_centicents_per_token: u32,
    pub output_centicents_per_token: u32,
    pub cache_read_centicents_per_token: u32,
    pub cache_write_centicents_per_token: u32,
}

/// A selectable model, as surfaced by the model picker overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub provider: String,
    pub id: String,
    pub name: String,
    pub context_window: u32,
    pub reasoning: bool,
    pub supports_x_high: bool,
    pub pricing: Pricing,
}

impl Model {
    /// The `provider/id` key used to persist the "last selected model" in
    /// `kestrel-config` and to match entries in `SessionEntryKind::ModelChange`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.provider, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_provider_and_id() {
        let model = Model {
            provider: "anthropic".into(),
            id: "claude-opus".into(),
            name: "Claude Opus".into(),
            context_window: 200_000,
            reasoning: true,
            supports_x_high: false,
            pricing: Pricing::default(),
        };
        assert_eq!(model.key(), "anthropic/claude-opus");
    }
}
