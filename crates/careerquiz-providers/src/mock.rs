//! Keyword-matching provider for tests and offline use.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use careerquiz_core::error::ProviderError;
use careerquiz_core::traits::{AdviceProvider, AdviceRequest, AdviceResponse, ModelInfo, TokenUsage};

const FALLBACK_REPLY: &str = "I can help with career paths, skill development, course \
recommendations, and job matching. Tell me a bit more about what you are aiming for.";

/// Answers from a fixed table of keyword → reply pairs.
///
/// Keywords are matched case-insensitively against the prompt, in insertion
/// order; the first hit wins.
pub struct MockProvider {
    responses: Vec<(String, String)>,
    default_response: String,
    failures: Mutex<VecDeque<ProviderError>>,
    call_count: AtomicU32,
    last_request: Mutex<Option<AdviceRequest>>,
}

impl MockProvider {
    /// Create a mock with the given keyword → reply mappings.
    pub fn new(responses: Vec<(String, String)>) -> Self {
        Self {
            responses: responses
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
            default_response: FALLBACK_REPLY.to_string(),
            failures: Mutex::new(VecDeque::new()),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same reply.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            default_response: response.to_string(),
            ..Self::new(Vec::new())
        }
    }

    /// Canned career-mentor replies, used when no API key is configured.
    pub fn offline_mentor() -> Self {
        let replies = [
            (
                "product analyst",
                "Product analyst roles lean on four areas:\n\n\
                 1. Data analysis: SQL, Python, spreadsheets\n\
                 2. Product metrics: A/B testing and analytics tooling\n\
                 3. Communication: presenting findings to stakeholders\n\
                 4. Business sense: market and user research\n\n\
                 SQL is usually the quickest gap to close.",
            ),
            (
                "data science",
                "A solid data science path:\n\n\
                 1. Python for data analysis\n\
                 2. Statistics fundamentals\n\
                 3. Introductory machine learning\n\n\
                 Plan for roughly twelve weeks of part-time study.",
            ),
            (
                "resume",
                "Resume checklist:\n\n\
                 - Quantify achievements (\"cut build time by 30%\")\n\
                 - Link portfolio projects that show the skills you list\n\
                 - Keep the skills section aligned with the roles you target",
            ),
            (
                "roadmap",
                "Break your roadmap into quarters: fundamentals first, then one \
                 portfolio project per quarter, then interview preparation.",
            ),
        ];
        Self::new(
            replies
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Fail the next calls with these errors, in order, before replying.
    pub fn with_failures(self, errors: impl IntoIterator<Item = ProviderError>) -> Self {
        Self {
            failures: Mutex::new(errors.into_iter().collect()),
            ..self
        }
    }

    /// Get the number of calls made to this provider.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this provider.
    pub fn last_request(&self) -> Option<AdviceRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl AdviceProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn advise(&self, request: &AdviceRequest) -> anyhow::Result<AdviceResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(request.clone());

        if let Some(err) = self
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
        {
            return Err(err.into());
        }

        let prompt = request.prompt.to_lowercase();
        let content = self
            .responses
            .iter()
            .find(|(key, _)| prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone());

        let prompt_tokens = (request.prompt.len() / 4) as u32; // Rough estimate
        let completion_tokens = (content.len() / 4) as u32;

        Ok(AdviceResponse {
            content,
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
                estimated_cost_usd: 0.0,
            },
            latency_ms: 1,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_context: 100_000,
            cost_per_1k_input: 0.0,
            cost_per_1k_output: 0.0,
        }]
    }
}
