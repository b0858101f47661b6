//! Question banks generated by a chat-completion model.
//!
//! Every call to `next_bank` asks the model for a fresh set of questions,
//! tagging the prompt with a per-attempt seed so consecutive attempts differ.
//! Transient provider failures are retried with backoff, honouring a
//! rate-limit hint when the provider gives one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use careerquiz_core::error::ProviderError;
use careerquiz_core::model::{Difficulty, Question, QuestionBank};
use careerquiz_core::traits::{
    extract_json_from_markdown, AdviceProvider, AdviceRequest, AdviceResponse, QuestionSource,
};

const GENERATOR_SYSTEM_PROMPT: &str = "You write multiple-choice skill assessment questions. \
Reply with a JSON array only. Each element has the fields \"id\", \"prompt\", \"options\" \
(an array of 4 strings), \"correct_index\" (0-based), and \"explanation\".";

const MAX_RETRIES: u32 = 2;
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// What to generate.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub bank_id: String,
    pub title: String,
    /// Topics to cover, e.g. "Hooks, Context, Performance".
    pub topic: String,
    pub difficulty: Difficulty,
    pub question_count: usize,
    pub model: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "question")]
    prompt: String,
    options: Vec<String>,
    #[serde(alias = "correctAnswer", alias = "answer")]
    correct_index: usize,
    #[serde(default)]
    explanation: String,
}

/// A [`QuestionSource`] backed by an [`AdviceProvider`].
pub struct GeneratedSource {
    provider: Arc<dyn AdviceProvider>,
    params: GenerationParams,
    attempt: AtomicU64,
}

impl GeneratedSource {
    pub fn new(provider: Arc<dyn AdviceProvider>, params: GenerationParams) -> Self {
        Self {
            provider,
            params,
            attempt: AtomicU64::new(1),
        }
    }

    fn prompt(&self, seed: u64) -> String {
        format!(
            "Write {count} {difficulty} multiple-choice questions for the skill test \
             \"{title}\" covering: {topic}. Attempt seed: {seed}. Do not reuse questions \
             from earlier attempts.",
            count = self.params.question_count,
            difficulty = self.params.difficulty,
            title = self.params.title,
            topic = self.params.topic,
        )
    }

    async fn request_with_retry(&self, request: &AdviceRequest) -> Result<AdviceResponse> {
        let mut retry_delay = INITIAL_RETRY_DELAY;
        let mut retry = 0;
        loop {
            let err = match self.provider.advise(request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            let provider_err = err.downcast_ref::<ProviderError>();
            if retry >= MAX_RETRIES || provider_err.is_some_and(ProviderError::is_permanent) {
                return Err(err);
            }
            if let Some(ms) = provider_err.and_then(ProviderError::retry_after_ms) {
                retry_delay = Duration::from_millis(ms);
            }

            retry += 1;
            tracing::warn!(
                provider = self.provider.name(),
                retry,
                delay_ms = retry_delay.as_millis() as u64,
                "question generation failed, retrying: {err:#}"
            );
            tokio::time::sleep(retry_delay).await;
            retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
        }
    }
}

/// Parse a model reply into a validated bank.
///
/// Surplus questions beyond `question_count` are dropped.
pub fn parse_generated_bank(reply: &str, params: &GenerationParams) -> Result<QuestionBank> {
    let json = extract_json_from_markdown(reply);
    let mut generated: Vec<GeneratedQuestion> =
        serde_json::from_str(&json).context("model reply is not a JSON question array")?;

    if generated.len() != params.question_count {
        tracing::warn!(
            bank = %params.bank_id,
            requested = params.question_count,
            received = generated.len(),
            "model returned a different number of questions"
        );
        generated.truncate(params.question_count);
    }

    let questions = generated
        .into_iter()
        .enumerate()
        .map(|(i, q)| Question {
            id: q
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("{}-{}", params.bank_id, i + 1)),
            prompt: q.prompt,
            options: q.options,
            correct_index: q.correct_index,
            explanation: q.explanation,
        })
        .collect();

    let bank = QuestionBank::new(params.bank_id.clone(), params.title.clone(), questions)
        .context("model produced an invalid question bank")?
        .with_description(params.topic.clone())
        .with_difficulty(params.difficulty);
    Ok(bank)
}

#[async_trait]
impl QuestionSource for GeneratedSource {
    fn name(&self) -> &str {
        "generated"
    }

    async fn next_bank(&self) -> Result<QuestionBank> {
        let seed = self.attempt.fetch_add(1, Ordering::Relaxed);
        let request = AdviceRequest {
            system_prompt: Some(GENERATOR_SYSTEM_PROMPT.to_string()),
            max_tokens: 4096,
            temperature: 0.8,
            ..AdviceRequest::new(self.params.model.clone(), self.prompt(seed))
        };

        tracing::info!(
            provider = self.provider.name(),
            bank = %self.params.bank_id,
            seed,
            "generating question bank"
        );
        let response = self
            .request_with_retry(&request)
            .await
            .with_context(|| format!("{} failed to generate questions", self.provider.name()))?;

        parse_generated_bank(&response.content, &self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;

    fn params() -> GenerationParams {
        GenerationParams {
            bank_id: "typescript".into(),
            title: "TypeScript Fundamentals".into(),
            topic: "Types, Interfaces, Generics".into(),
            difficulty: Difficulty::Intermediate,
            question_count: 2,
            model: "mock-model".into(),
        }
    }

    const REPLY: &str = r#"Here are your questions:

```json
[
  {"question": "Which keyword declares an interface?", "options": ["type", "interface", "class", "enum"], "correctAnswer": 1, "explanation": "interface declares an interface."},
  {"id": "generics", "prompt": "What does <T> introduce?", "options": ["A type parameter", "A tuple"], "correct_index": 0}
]
```"#;

    #[test]
    fn parses_fenced_reply_with_aliases() {
        let bank = parse_generated_bank(REPLY, &params()).unwrap();
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.questions()[0].id, "typescript-1");
        assert_eq!(bank.questions()[0].correct_index, 1);
        assert_eq!(bank.questions()[1].id, "generics");
        assert_eq!(bank.description, "Types, Interfaces, Generics");
    }

    #[test]
    fn rejects_invalid_questions() {
        let reply = r#"[{"prompt": "?", "options": ["only one"], "correct_index": 0}]"#;
        let err = parse_generated_bank(reply, &params()).unwrap_err();
        assert!(format!("{err:#}").contains("at least 2 options"));
    }

    #[test]
    fn rejects_empty_array() {
        let err = parse_generated_bank("[]", &params()).unwrap_err();
        assert!(format!("{err:#}").contains("empty"));
    }

    #[test]
    fn rejects_prose() {
        assert!(parse_generated_bank("Sorry, I can't help with that.", &params()).is_err());
    }

    #[tokio::test]
    async fn each_attempt_uses_new_seed() {
        let provider = Arc::new(MockProvider::with_fixed_response(REPLY));
        let source = GeneratedSource::new(provider.clone(), params());

        source.next_bank().await.unwrap();
        let first = provider.last_request().unwrap();
        source.next_bank().await.unwrap();
        let second = provider.last_request().unwrap();

        assert!(first.prompt.contains("Attempt seed: 1"));
        assert!(second.prompt.contains("Attempt seed: 2"));
        assert_eq!(
            second.system_prompt.as_deref(),
            Some(GENERATOR_SYSTEM_PROMPT)
        );
        assert_eq!(provider.call_count(), 2);
    }

    #[test]
    fn surplus_questions_are_dropped() {
        let params = GenerationParams {
            question_count: 1,
            ..params()
        };
        let bank = parse_generated_bank(REPLY, &params).unwrap();
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.questions()[0].id, "typescript-1");
    }

    #[test]
    fn short_reply_is_kept() {
        let params = GenerationParams {
            question_count: 5,
            ..params()
        };
        assert_eq!(parse_generated_bank(REPLY, &params).unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_is_retried_after_hint() {
        let provider = Arc::new(
            MockProvider::with_fixed_response(REPLY).with_failures([ProviderError::RateLimited {
                retry_after_ms: 5000,
            }]),
        );
        let source = GeneratedSource::new(provider.clone(), params());

        let start = tokio::time::Instant::now();
        let bank = source.next_bank().await.unwrap();
        assert_eq!(bank.len(), 2);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(start.elapsed(), Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn authentication_failure_is_not_retried() {
        let provider = Arc::new(
            MockProvider::with_fixed_response(REPLY)
                .with_failures([ProviderError::AuthenticationFailed("bad key".into())]),
        );
        let source = GeneratedSource::new(provider.clone(), params());

        let err = source.next_bank().await.unwrap_err();
        assert!(format!("{err:#}").contains("authentication failed"));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_repeated_timeouts() {
        let provider = Arc::new(
            MockProvider::with_fixed_response(REPLY).with_failures([
                ProviderError::Timeout(30),
                ProviderError::Timeout(30),
                ProviderError::Timeout(30),
            ]),
        );
        let source = GeneratedSource::new(provider.clone(), params());

        let err = source.next_bank().await.unwrap_err();
        assert!(format!("{err:#}").contains("timed out"));
        assert_eq!(provider.call_count(), 3);
    }
}
