//! careerquiz-core: Quiz engine, countdown timer, and scoring.
//!
//! This crate defines the question bank model, the attempt state machine,
//! result aggregation, and the async session driver that the CLI and
//! providers build on.

pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod results;
pub mod session;
pub mod source;
pub mod timer;
pub mod traits;
