//! The `careerquiz list-models` command.

use std::path::PathBuf;

use anyhow::Result;

use careerquiz_providers::{create_provider, load_config_from};

pub fn execute(provider_filter: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let mut names: Vec<&String> = config.providers.keys().collect();
    names.sort();

    let mut found_any = false;

    for name in names {
        if let Some(filter) = &provider_filter {
            if name != filter {
                continue;
            }
        }

        let models = match create_provider(&config.providers[name]) {
            Ok(provider) => provider.available_models(),
            Err(e) => {
                tracing::warn!(provider = %name, "skipping: {e:#}");
                continue;
            }
        };

        if !models.is_empty() {
            found_any = true;
            println!("Provider: {name}");
            for model in &models {
                println!(
                    "  {} - {} ({}K context, ${:.4}/{:.4} per 1K tokens)",
                    model.id,
                    model.name,
                    model.max_context / 1000,
                    model.cost_per_1k_input,
                    model.cost_per_1k_output,
                );
            }
            println!();
        }
    }

    if !found_any {
        println!("No providers configured. Run `careerquiz init` to create a config file.");
    }

    Ok(())
}
