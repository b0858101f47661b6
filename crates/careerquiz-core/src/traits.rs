//! Core trait definitions for question sources and chat-advice providers.
//!
//! Question sources live in this crate ([`crate::source`]); chat providers
//! are implemented by `careerquiz-providers`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::QuestionBank;

// ---------------------------------------------------------------------------
// Question source trait
// ---------------------------------------------------------------------------

/// Supplies question banks on quiz start and on every regeneration.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Human-readable source name (e.g. "static").
    fn name(&self) -> &str;

    /// Produce the bank for the next attempt.
    async fn next_bank(&self) -> anyhow::Result<QuestionBank>;
}

// ---------------------------------------------------------------------------
// Advice provider trait
// ---------------------------------------------------------------------------

/// Trait for chat-completion backends that answer career questions.
#[async_trait]
pub trait AdviceProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Send one prompt and wait for the full reply.
    async fn advise(&self, request: &AdviceRequest) -> anyhow::Result<AdviceResponse>;

    /// List known models for this provider.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// A single chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceRequest {
    /// Model identifier (e.g. "gpt-4o-mini").
    pub model: String,
    /// The user's message.
    pub prompt: String,
    /// Role instruction; [`DEFAULT_SYSTEM_PROMPT`] when `None`.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

impl AdviceRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system_prompt: None,
            max_tokens: 1024,
            temperature: 0.7,
        }
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

/// Reply to an [`AdviceRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceResponse {
    /// The reply text.
    pub content: String,
    /// Model that actually answered.
    pub model: String,
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub estimated_cost_usd: f64,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: String,
    /// Context window in tokens.
    pub max_context: u32,
    pub cost_per_1k_input: f64,
    pub cost_per_1k_output: f64,
}

/// Default role instruction for the career assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a career guidance expert helping students plan their growth.";

// ---------------------------------------------------------------------------
// Markdown JSON extraction
// ---------------------------------------------------------------------------

/// Extract a JSON payload from a chat reply.
///
/// Handles:
/// - A ```json``` block (the first one wins)
/// - A generic ``` block if no json block is present
/// - Raw JSON with surrounding prose (outermost `[`...`]` or `{`...`}`)
pub fn extract_json_from_markdown(response: &str) -> String {
    let mut json_block: Option<String> = None;
    let mut generic_block: Option<String> = None;
    let mut in_block = false;
    let mut is_json_block = false;
    let mut current = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json_block = lang == "json";
            current.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            if is_json_block {
                json_block.get_or_insert_with(|| current.clone());
            } else {
                generic_block.get_or_insert_with(|| current.clone());
            }
            continue;
        }

        if in_block {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }

    if let Some(block) = json_block.or(generic_block) {
        return block;
    }

    let start = response.find(['[', '{']);
    let end = response.rfind([']', '}']);
    match (start, end) {
        (Some(s), Some(e)) if e > s => response[s..=e].to_string(),
        _ => response.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_to_career_prompt() {
        let req = AdviceRequest::new("gpt-4o-mini", "Which skills do I need?");
        assert_eq!(req.system_prompt(), DEFAULT_SYSTEM_PROMPT);

        let custom = AdviceRequest {
            system_prompt: Some("Be brief.".into()),
            ..req
        };
        assert_eq!(custom.system_prompt(), "Be brief.");
    }

    #[test]
    fn extract_json_block() {
        let input = "Here you go:\n\n```json\n[{\"a\": 1}]\n```\n\nEnjoy!";
        assert_eq!(extract_json_from_markdown(input), "[{\"a\": 1}]");
    }

    #[test]
    fn extract_prefers_json_over_generic() {
        let input = "```\nnot this\n```\n\n```json\n{\"b\": 2}\n```";
        assert_eq!(extract_json_from_markdown(input), "{\"b\": 2}");
    }

    #[test]
    fn extract_generic_block_fallback() {
        let input = "```\n[1, 2]\n```";
        assert_eq!(extract_json_from_markdown(input), "[1, 2]");
    }

    #[test]
    fn extract_raw_json_with_prose() {
        let input = "Sure! [{\"id\": \"q1\"}] Hope that helps.";
        assert_eq!(extract_json_from_markdown(input), "[{\"id\": \"q1\"}]");
    }

    #[test]
    fn extract_plain_text_returned_trimmed() {
        assert_eq!(extract_json_from_markdown("  nothing here  "), "nothing here");
    }
}
