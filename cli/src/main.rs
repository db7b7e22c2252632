//! Entrypoint: parses args, loads settings and credentials, builds an
//! `AgentSession`, and hands it to the TUI event loop. Filesystem discovery
//! (skills, context files, extension modules) and concrete provider
//! endpoints are wired here rather than owned by any inner crate, since
//! nothing else in the workspace needs to know the CLI's defaults.

mod error;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use error::CliError;
use kestrel_agent_session::{AgentSessionBuilder, FacadeHandle};
use kestrel_config::{Settings, paths};
use kestrel_credentials::CredentialStore;
use kestrel_protocol::Model;
use kestrel_provider::RetryConfig;

/// A terminal coding-agent front end.
#[derive(Debug, Parser)]
#[command(name = "kestrel", version, about)]
struct Cli {
    /// Session log to open or create. Defaults to a fresh session under
    /// `~/.kestrel/sessions/<uuid>.jsonl`.
    #[arg(long, value_name = "PATH")]
    session: Option<PathBuf>,

    /// Model to start with, as `provider/id` (e.g. `anthropic/claude-sonnet`).
    /// Defaults to the settings file's `default_model`, then the catalog's
    /// first entry.
    #[arg(long, value_name = "PROVIDER/ID")]
    model: Option<String>,

    /// Raise the file log level to debug for the `kestrel` target.
    #[arg(long)]
    verbose: bool,

    /// Print the model catalog and exit.
    #[arg(long)]
    list_models: bool,
}

fn endpoint_for(provider: &str) -> String {
    match provider {
        "anthropic" => "https://api.anthropic.com/v1/messages".to_string(),
        "openai" => "https://api.openai.com/v1/chat/completions".to_string(),
        other => format!("https://api.{other}.example/v1/messages"),
    }
}

fn resolve_model(catalog: &[Model], requested: Option<&str>, settings: &Settings) -> Result<Model, CliError> {
    let key = requested.or(settings.default_model.as_deref());
    match key {
        Some(key) => catalog.iter().find(|m| m.key() == key).cloned().ok_or_else(|| CliError::UnknownModel(key.to_string())),
        None => catalog.first().cloned().ok_or_else(|| CliError::UnknownModel("<empty catalog>".to_string())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logging_guard = logging::init(cli.verbose)?;
    tracing::info!("starting kestrel");

    let settings = Settings::load_default()?;
    let credentials = Arc::new(CredentialStore::new(paths::auth_path()));

    let catalog = kestrel_config::load_models(&credentials).await;
    if cli.list_models {
        for model in &catalog {
            println!("{} — {} (context window {})", model.key(), model.name, model.context_window);
        }
        return Ok(());
    }

    let model = resolve_model(&catalog, cli.model.as_deref(), &settings)?;
    let endpoint = endpoint_for(&model.provider);
    tracing::info!(model = %model.key(), "resolved model");

    let session_path = cli.session.unwrap_or_else(|| paths::sessions_dir().join(format!("{}.jsonl", uuid::Uuid::new_v4())));
    if let Some(parent) = session_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    tracing::info!(path = %session_path.display(), "opening session");

    let retry_config = RetryConfig {
        max_retries: settings.retry.max_retries,
        base_delay_ms: settings.retry.base_delay_ms,
        max_delay_ms: settings.retry.max_delay_ms,
        multiplier: settings.retry.multiplier,
    };

    let (facade, session_events) = AgentSessionBuilder::new(model, endpoint, credentials, session_path)
        .compaction_threshold(settings.compaction_threshold)
        .retry_config(retry_config)
        .build()
        .await?;

    let facade = FacadeHandle::new(facade);
    kestrel_tui::App::run(facade, session_events, &settings).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use kestrel_protocol::model::Pricing;

    fn catalog() -> Vec<Model> {
        vec![
            Model {
                provider: "anthropic".into(),
                id: "claude-sonnet".into(),
                name: "Claude Sonnet".into(),
                context_window: 200_000,
                reasoning: true,
                supports_x_high: false,
                pricing: Pricing::default(),
            },
            Model {
                provider: "openai".into(),
                id: "gpt-5".into(),
                name: "GPT-5".into(),
                context_window: 272_000,
                reasoning: true,
                supports_x_high: true,
                pricing: Pricing::default(),
            },
        ]
    }

    #[test]
    fn cli_flag_overrides_settings_default() {
        let mut settings = Settings::default();
        settings.default_model = Some("openai/gpt-5".into());
        let model = resolve_model(&catalog(), Some("anthropic/claude-sonnet"), &settings).expect("resolve");
        assert_eq!(model.key(), "anthropic/claude-sonnet");
    }

    #[test]
    fn falls_back_to_settings_default_model() {
        let mut settings = Settings::default();
        settings.default_model = Some("openai/gpt-5".into());
        let model = resolve_model(&catalog(), None, &settings).expect("resolve");
        assert_eq!(model.key(), "openai/gpt-5");
    }

    #[test]
    fn falls_back_to_first_catalog_entry_with_no_default() {
        let model = resolve_model(&catalog(), None, &Settings::default()).expect("resolve");
        assert_eq!(model.key(), "anthropic/claude-sonnet");
    }

    #[test]
    fn unknown_model_is_rejected() {
        let err = resolve_model(&catalog(), Some("mistral/large"), &Settings::default()).unwrap_err();
        assert!(matches!(err, CliError::UnknownModel(key) if key == "mistral/large"));
    }

    #[test]
    fn known_providers_get_their_real_endpoint() {
        assert_eq!(endpoint_for("anthropic"), "https://api.anthropic.com/v1/messages");
        assert_eq!(endpoint_for("openai"), "https://api.openai.com/v1/chat/completions");
    }
}
