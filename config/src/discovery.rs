//! Filesystem discovery collaborators. The glob-walk internals a full implementation would use
//! (ignore-file handling, recursive depth limits, symlink cycles) are out of scope here; these
//! loaders keep the fixed signatures the rest of the repo builds against and do the simplest thing
//! that satisfies them: a direct, non-recursive directory read.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kestrel_protocol::Model;

/// A skill directory discovered under the agent's extension/skill search
/// path: a directory containing a `SKILL.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillRef {
    pub name: String,
    pub path: PathBuf,
}

/// A prompt template file discovered under `agentDir/prompts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplateRef {
    pub name: String,
    pub path: PathBuf,
}

/// Loads compiled extensions from `paths`. Dynamic loading of compiled Rust
/// plugins (`dlopen`-style) is out of scope for this repo; callers that
/// need extensions wire them up in-process and never go through this path
/// today, so it always returns empty.
pub fn discover_extensions(_paths: &[PathBuf], _cwd: &Path, _agent_dir: &Path) -> Vec<Arc<dyn kestrel_extensions::ExtensionModule>> {
    Vec::new()
}

/// Direct subdirectories of `cwd/.kestrel/skills` and `agentDir/skills`
/// containing a `SKILL.md`.
pub fn discover_skills(cwd: &Path, agent_dir: &Path) -> Vec<SkillRef> {
    let mut found = Vec::new();
    for root in [cwd.join(".kestrel").join("skills"), agent_dir.join("skills")] {
        let Ok(entries) = std::fs::read_dir(&root) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() && path.join("SKILL.md").is_file() {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                found.push(SkillRef { name, path });
            }
        }
    }
    found
}

/// `CLAUDE.md`/`AGENTS.md`-style context files directly under `cwd`.
pub fn discover_context_files(cwd: &Path) -> Vec<PathBuf> {
    const CANDIDATES: [&str; 2] = ["CLAUDE.md", "AGENTS.md"];
    CANDIDATES.iter().map(|name| cwd.join(name)).filter(|path| path.is_file()).collect()
}

/// `.md` files directly under `agentDir/prompts`.
pub fn discover_prompt_templates(agent_dir: &Path) -> Vec<PromptTemplateRef> {
    let root = agent_dir.join("prompts");
    let Ok(entries) = std::fs::read_dir(&root) else { return Vec::new() };
    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("md"))
        .map(|path| {
            let name = path.file_stem().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            PromptTemplateRef { name, path }
        })
        .collect()
}

/// The built-in model catalog. A production build would fetch this from a
/// provider-hosted registry using `auth`; concrete provider endpoints are
/// out of scope here, so this returns a fixed catalog covering the
/// providers `kestrel-provider` already speaks.
pub async fn load_models(_auth: &kestrel_credentials::CredentialStore) -> Vec<Model> {
    use kestrel_protocol::model::Pricing;

    vec![
        Model {
            provider: "anthropic".into(),
            id: "claude-sonnet".into(),
            name: "Claude Sonnet".into(),
            context_window: 200_000,
            reasoning: true,
            supports_x_high: false,
            pricing: Pricing { input_centicents_per_token: 0, output_centicents_per_token: 0, cache_read_centicents_per_token: 0, cache_write_centicents_per_token: 0 },
        },
        Model {
            provider: "openai".into(),
            id: "gpt-5".into(),
            name: "GPT-5".into(),
            context_window: 272_000,
            reasoning: true,
            supports_x_high: true,
            pricing: Pricing { input_centicents_per_token: 0, output_centicents_per_token: 0, cache_read_centicents_per_token: 0, cache_write_centicents_per_token: 0 },
        },
    ]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn discover_skills_finds_directories_with_a_skill_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let skills_dir = dir.path().join(".kestrel").join("skills").join("my-skill");
        std::fs::create_dir_all(&skills_dir).expect("mkdir");
        std::fs::write(skills_dir.join("SKILL.md"), "# my-skill").expect("write");

        let found = discover_skills(dir.path(), Path::new("/nonexistent"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "my-skill");
    }

    #[test]
    fn discover_context_files_only_matches_known_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("CLAUDE.md"), "hi").expect("write");
        std::fs::write(dir.path().join("README.md"), "hi").expect("write");

        let found = discover_context_files(dir.path());
        assert_eq!(found, vec![dir.path().join("CLAUDE.md")]);
    }

    #[test]
    fn discover_prompt_templates_lists_markdown_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let prompts_dir = dir.path().join("prompts");
        std::fs::create_dir_all(&prompts_dir).expect("mkdir");
        std::fs::write(prompts_dir.join("plan.md"), "...").expect("write");
        std::fs::write(prompts_dir.join("notes.txt"), "...").expect("write");

        let found = discover_prompt_templates(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "plan");
    }
}
