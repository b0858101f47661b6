//! Result aggregation for finalized attempts.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::QuestionBank;

/// How one question of an attempt was answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    /// The submitted option, or `None` for "no answer".
    pub selected: Option<usize>,
    pub correct: bool,
    /// Submitted by the countdown rather than the user.
    pub timed_out: bool,
}

/// Percentage of correct answers, rounded to the nearest integer.
///
/// Returns 0 for an empty total.
pub fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * score as f64 / total as f64).round() as u32
}

/// Final outcome of a completed attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
    pub attempt_id: u64,
    pub bank_id: String,
    pub bank_title: String,
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    pub answers: Vec<AnswerRecord>,
    pub completed_at: DateTime<Utc>,
}

impl QuizResult {
    /// Aggregate a finalized attempt. `score` is taken as already tallied.
    pub fn new(attempt_id: u64, bank: &QuestionBank, score: u32, answers: Vec<AnswerRecord>) -> Self {
        let total = bank.len() as u32;
        Self {
            attempt_id,
            bank_id: bank.id.clone(),
            bank_title: bank.title.clone(),
            score,
            total,
            percentage: percentage(score, total),
            answers,
            completed_at: Utc::now(),
        }
    }

    /// Number of questions that were submitted by the countdown.
    pub fn timed_out_count(&self) -> usize {
        self.answers.iter().filter(|a| a.timed_out).count()
    }

    /// A short label for the score band.
    pub fn grade(&self) -> &'static str {
        match self.percentage {
            90..=100 => "excellent",
            75..=89 => "proficient",
            50..=74 => "developing",
            _ => "needs practice",
        }
    }

    /// Save the result as pretty-printed JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize result")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write result to {}", path.display()))?;
        Ok(())
    }

    /// Load a result saved with [`QuizResult::save_json`].
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read result from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse result JSON")
    }
}
