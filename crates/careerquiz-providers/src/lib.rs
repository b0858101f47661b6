//! careerquiz-providers: chat-completion backends.
//!
//! Implements the `AdviceProvider` trait for OpenAI-compatible APIs and an offline
//! canned-reply mentor, plus a `QuestionSource` that asks a provider to write
//! a fresh question bank for every attempt.

pub mod config;
pub mod generated;
pub mod mock;
pub mod openai;

pub use careerquiz_core::error::ProviderError;
pub use config::{
    create_provider, load_config, load_config_from, resolve_provider, CareerQuizConfig,
    ProviderConfig, QuizSettings,
};
pub use generated::{GeneratedSource, GenerationParams};
