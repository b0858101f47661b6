//! Error types for the quiz engine and chat providers.
//!
//! `QuizError` covers rejected quiz transitions. `ProviderError` is defined
//! here rather than in `careerquiz-providers` so question sources can
//! classify chat failures without string matching.

use thiserror::Error;

/// A rejected quiz operation. The engine state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// The operation is not allowed in the current attempt state.
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },

    /// The chosen option does not exist on the current question.
    #[error("option {index} is out of range (question has {option_count} options)")]
    OutOfRangeSelection { index: usize, option_count: usize },

    /// A question bank must contain at least one question.
    #[error("question bank is empty")]
    EmptyBank,

    /// A question failed structural validation.
    #[error("invalid question '{id}': {reason}")]
    InvalidQuestion { id: String, reason: String },
}

/// Errors that can occur when talking to a chat-completion provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Returns `true` if retrying the same request cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_) | ProviderError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}
