//! `rebuildSystemPrompt`: a pure function of `{cwd, agentDir, skills, contextFiles,
//! activeToolNames, customPromptOverride}`. Called whenever active tools change; never reads
//! anything outside its inputs so the same inputs always rebuild the same prompt.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct SystemPromptInputs {
    pub cwd: PathBuf,
    pub agent_dir: PathBuf,
    pub skills: Vec<String>,
    pub context_files: Vec<PathBuf>,
    pub active_tool_names: Vec<String>,
    pub custom_prompt_override: Option<String>,
}

/// Renders the system prompt. If `custom_prompt_override` is set, it
/// replaces the generated body outright — callers who set it are opting out
/// of the generated framing entirely, not appending to it.
pub fn rebuild_system_prompt(inputs: &SystemPromptInputs) -> String {
    if let Some(custom) = &inputs.custom_prompt_override {
        return custom.clone();
    }

    let mut sections = Vec::new();
    sections.push(format!("Working directory: {}", inputs.cwd.display()));

    if !inputs.active_tool_names.is_empty() {
        sections.push(format!("Available tools: {}", inputs.active_tool_names.join(", ")));
    }

    if !inputs.skills.is_empty() {
        sections.push(format!("Loaded skills: {}", inputs.skills.join(", ")));
    }

    for path in &inputs.context_files {
        if let Some(body) = read_context_file(path) {
            sections.push(format!("--- {} ---\n{}", path.display(), body));
        }
    }

    sections.join("\n\n")
}

fn read_context_file(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok()
}
