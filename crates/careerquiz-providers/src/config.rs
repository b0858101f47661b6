//! Configuration loading and provider factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use careerquiz_core::engine::EngineConfig;
use careerquiz_core::timer::DEFAULT_TIME_LIMIT;
use careerquiz_core::traits::AdviceProvider;

use crate::mock::MockProvider;
use crate::openai::OpenAiProvider;

/// Configuration for a single chat provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    /// Canned replies, no network access.
    Offline,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Offline => f.write_str("Offline"),
        }
    }
}

/// Quiz behaviour settings (`[quiz]` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSettings {
    /// Run a countdown on each question.
    #[serde(default = "default_true")]
    pub timer_enabled: bool,
    /// Seconds per question.
    #[serde(default = "default_time_limit")]
    pub time_limit_secs: u32,
    /// Reshuffle the bank on every attempt.
    #[serde(default)]
    pub shuffle: bool,
    /// Directory holding question bank TOML files.
    #[serde(default = "default_bank_dir")]
    pub bank_dir: PathBuf,
}

fn default_true() -> bool {
    true
}
fn default_time_limit() -> u32 {
    DEFAULT_TIME_LIMIT
}
fn default_bank_dir() -> PathBuf {
    PathBuf::from("./banks")
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            timer_enabled: true,
            time_limit_secs: default_time_limit(),
            shuffle: false,
            bank_dir: default_bank_dir(),
        }
    }
}

impl QuizSettings {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.time_limit_secs >= 1,
            "quiz.time_limit_secs must be at least 1"
        );
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            timer_enabled: self.timer_enabled,
            time_limit: self.time_limit_secs,
        }
    }
}

/// Top-level careerquiz configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareerQuizConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Provider used by `advise` when none is given.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Model used when none is given.
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default)]
    pub quiz: QuizSettings,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for CareerQuizConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            quiz: QuizSettings::default(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        ProviderConfig::Offline => ProviderConfig::Offline,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `careerquiz.toml` in the current directory
/// 2. `~/.config/careerquiz/config.toml`
///
/// Environment variable override: `CAREERQUIZ_OPENAI_KEY`.
pub fn load_config() -> Result<CareerQuizConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<CareerQuizConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("careerquiz.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<CareerQuizConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => CareerQuizConfig::default(),
    };

    if let Ok(key) = std::env::var("CAREERQUIZ_OPENAI_KEY") {
        config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let Some(ProviderConfig::OpenAI { api_key, .. }) = config.providers.get_mut("openai") {
            *api_key = key;
        }
    }

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    config.quiz.validate()?;
    tracing::debug!(
        path = ?config_path,
        providers = config.providers.len(),
        "configuration loaded"
    );

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("careerquiz"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn AdviceProvider>> {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => {
            anyhow::ensure!(
                !api_key.trim().is_empty(),
                "OpenAI api_key is empty; set CAREERQUIZ_OPENAI_KEY or edit careerquiz.toml"
            );
            Ok(Box::new(OpenAiProvider::new(
                api_key,
                base_url.clone(),
                org_id.clone(),
            )?))
        }
        ProviderConfig::Offline => Ok(Box::new(MockProvider::offline_mentor())),
    }
}

/// Look up a provider by name (or the configured default) and build it.
///
/// The name `offline` always resolves, even when it is not configured.
pub fn resolve_provider(
    config: &CareerQuizConfig,
    name: Option<&str>,
) -> Result<Box<dyn AdviceProvider>> {
    let name = name.unwrap_or(&config.default_provider);
    match config.providers.get(name) {
        Some(pconfig) => create_provider(pconfig),
        None if name == "offline" => create_provider(&ProviderConfig::Offline),
        None => {
            let mut available: Vec<&String> = config.providers.keys().collect();
            available.sort();
            anyhow::bail!("provider '{name}' not found in config. Available: {available:?}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_CAREERQUIZ_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_CAREERQUIZ_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_CAREERQUIZ_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_CAREERQUIZ_TEST_VAR");
    }

    #[test]
    fn resolve_env_vars_unterminated() {
        assert_eq!(resolve_env_vars("${NOPE"), "${NOPE");
    }

    #[test]
    fn default_config() {
        let config = CareerQuizConfig::default();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert!(config.quiz.timer_enabled);
        assert_eq!(config.quiz.time_limit_secs, 30);
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
default_provider = "local"
default_model = "llama3.1:8b"

[providers.openai]
type = "openai"
api_key = "sk-openai"

[providers.local]
type = "openai"
api_key = "unused"
base_url = "http://localhost:11434"

[providers.offline]
type = "offline"

[quiz]
timer_enabled = false
time_limit_secs = 45
shuffle = true
"#;
        let config: CareerQuizConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.providers.len(), 3);
        assert!(matches!(
            config.providers.get("local"),
            Some(ProviderConfig::OpenAI { base_url: Some(url), .. }) if url == "http://localhost:11434"
        ));
        assert!(!config.quiz.timer_enabled);
        assert!(config.quiz.shuffle);
        assert_eq!(config.quiz.bank_dir, PathBuf::from("./banks"));

        let engine = config.quiz.engine_config();
        assert!(!engine.timer_enabled);
        assert_eq!(engine.time_limit, 45);
    }

    #[test]
    fn debug_masks_api_key() {
        let config = ProviderConfig::OpenAI {
            api_key: "sk-secret".into(),
            base_url: None,
            org_id: None,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn zero_time_limit_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("careerquiz.toml");
        std::fs::write(&path, "[quiz]\ntime_limit_secs = 0\n").unwrap();
        let err = load_config_from(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("time_limit_secs"));
    }

    #[test]
    fn missing_explicit_config_fails() {
        let err = load_config_from(Some(Path::new("/no/such/careerquiz.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn offline_always_resolves() {
        let config = CareerQuizConfig::default();
        let provider = resolve_provider(&config, Some("offline")).unwrap();
        assert_eq!(provider.name(), "mock");

        let err = resolve_provider(&config, Some("anthropic")).err().unwrap();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn empty_openai_key_rejected() {
        let err = create_provider(&ProviderConfig::OpenAI {
            api_key: "  ".into(),
            base_url: None,
            org_id: None,
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("api_key is empty"));
    }
}
