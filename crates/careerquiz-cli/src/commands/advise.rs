//! The `careerquiz advise` command.

use std::path::PathBuf;

use anyhow::Result;

use careerquiz_core::traits::AdviceRequest;
use careerquiz_providers::{load_config_from, resolve_provider};

pub async fn execute(
    prompt: String,
    provider_name: Option<String>,
    model: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(!prompt.trim().is_empty(), "prompt must not be empty");

    let config = load_config_from(config_path.as_deref())?;
    let provider = resolve_provider(&config, provider_name.as_deref())?;
    let model = model.unwrap_or_else(|| config.default_model.clone());

    tracing::debug!(provider = provider.name(), %model, "asking for advice");
    let response = provider.advise(&AdviceRequest::new(model, prompt)).await?;

    println!("{}", response.content);
    eprintln!(
        "\n[{} via {}: {} tokens, {}ms]",
        response.model,
        provider.name(),
        response.token_usage.total_tokens,
        response.latency_ms
    );
    Ok(())
}
