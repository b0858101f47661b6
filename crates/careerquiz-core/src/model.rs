//! Core data model types for careerquiz.
//!
//! Questions and question banks are immutable once built. A bank can only be
//! constructed through [`QuestionBank::new`], which enforces the structural
//! rules every attempt relies on.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QuizError;

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier, unique within its bank.
    pub id: String,
    /// The question text.
    pub prompt: String,
    /// Answer options, in display order.
    pub options: Vec<String>,
    /// 0-based index of the correct option.
    pub correct_index: usize,
    /// Shown once the question has been answered.
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    /// Whether `selected` is the correct option. `None` is never correct.
    pub fn is_correct(&self, selected: Option<usize>) -> bool {
        selected == Some(self.correct_index)
    }

    fn check(&self) -> Result<(), QuizError> {
        if self.options.len() < 2 {
            return Err(QuizError::InvalidQuestion {
                id: self.id.clone(),
                reason: format!("needs at least 2 options, has {}", self.options.len()),
            });
        }
        if self.correct_index >= self.options.len() {
            return Err(QuizError::InvalidQuestion {
                id: self.id.clone(),
                reason: format!(
                    "correct_index {} is out of range for {} options",
                    self.correct_index,
                    self.options.len()
                ),
            });
        }
        Ok(())
    }
}

/// How hard a skill test is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Beginner => write!(f, "beginner"),
            Difficulty::Intermediate => write!(f, "intermediate"),
            Difficulty::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" | "easy" => Ok(Difficulty::Beginner),
            "intermediate" | "medium" => Ok(Difficulty::Intermediate),
            "advanced" | "hard" => Ok(Difficulty::Advanced),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// An ordered, validated collection of questions for one quiz session.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionBank {
    /// Bank identifier (e.g. "react-advanced").
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// What the bank covers.
    pub description: String,
    /// Difficulty label.
    pub difficulty: Difficulty,
    /// Tags for filtering the catalog.
    pub tags: Vec<String>,
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Build a bank, rejecting empty banks and malformed questions.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::EmptyBank);
        }

        let mut seen = HashSet::new();
        for q in &questions {
            q.check()?;
            if !seen.insert(q.id.as_str()) {
                return Err(QuizError::InvalidQuestion {
                    id: q.id.clone(),
                    reason: "duplicate question id".into(),
                });
            }
        }

        Ok(Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            difficulty: Difficulty::default(),
            tags: Vec::new(),
            questions,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Number of questions. Always at least 1.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// A new bank with the same metadata and the given question order.
    ///
    /// Used by sources that reshuffle per attempt; `self` is not touched.
    pub fn with_questions(&self, questions: Vec<Question>) -> Result<Self, QuizError> {
        let bank = QuestionBank::new(self.id.clone(), self.title.clone(), questions)?;
        Ok(bank
            .with_description(self.description.clone())
            .with_difficulty(self.difficulty)
            .with_tags(self.tags.clone()))
    }
}

/// One entry of the skill-test catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    pub question_count: usize,
    /// Estimated duration in minutes.
    pub duration_mins: u32,
    /// Highlighted in the catalog listing.
    #[serde(default)]
    pub recommended: bool,
    /// Where the bank was loaded from.
    pub path: PathBuf,
}

/// The list of skill tests available to the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestCatalog {
    pub entries: Vec<CatalogEntry>,
}

impl TestCatalog {
    pub fn find(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Recommended tests first, then by title.
    pub fn sorted(mut self) -> Self {
        self.entries.sort_by(|a, b| {
            b.recommended
                .cmp(&a.recommended)
                .then_with(|| a.title.cmp(&b.title))
        });
        self
    }
}

#[cfg(test)]
pub(crate) fn sample_question(id: &str, correct_index: usize) -> Question {
    Question {
        id: id.into(),
        prompt: format!("Question {id}?"),
        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        correct_index,
        explanation: format!("Because {correct_index}."),
    }
}
