//! Settings file, cache directory, and state-directory layout.

pub mod cache;
pub mod discovery;
pub mod error;
pub mod paths;
pub mod settings;

pub use cache::PromptCache;
pub use discovery::{discover_context_files, discover_extensions, discover_prompt_templates, discover_skills, load_models, PromptTemplateRef, SkillRef};
pub use error::{ConfigError, Result};
pub use settings::{RetrySettings, Settings};
