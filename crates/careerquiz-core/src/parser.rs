//! TOML question bank parser.
//!
//! Loads question banks from TOML files and directories, builds the
//! skill-test catalog, and reports quality warnings.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{CatalogEntry, Difficulty, Question, QuestionBank, TestCatalog};

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_difficulty_str")]
    difficulty: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    duration_mins: Option<u32>,
    #[serde(default)]
    recommended: bool,
}

fn default_difficulty_str() -> String {
    "intermediate".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    #[serde(default)]
    explanation: String,
}

struct ParsedBank {
    bank: QuestionBank,
    duration_mins: Option<u32>,
    recommended: bool,
}

fn parse_file_str(content: &str, source_path: &Path) -> Result<ParsedBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let difficulty: Difficulty = parsed
        .bank
        .difficulty
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}", e))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| Question {
            id: q.id,
            prompt: q.prompt.trim().to_string(),
            options: q.options,
            correct_index: q.correct_index,
            explanation: q.explanation.trim().to_string(),
        })
        .collect();

    let bank = QuestionBank::new(parsed.bank.id, parsed.bank.title, questions)
        .with_context(|| format!("invalid question bank: {}", source_path.display()))?
        .with_description(parsed.bank.description)
        .with_difficulty(difficulty)
        .with_tags(parsed.bank.tags);

    Ok(ParsedBank {
        bank,
        duration_mins: parsed.bank.duration_mins,
        recommended: parsed.bank.recommended,
    })
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn parse_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank` (useful for testing).
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    Ok(parse_file_str(content, source_path)?.bank)
}

fn toml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(toml_files(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Recursively load all `.toml` bank files from a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();
    for path in toml_files(dir)? {
        match parse_bank(&path) {
            Ok(bank) => banks.push(bank),
            Err(e) => tracing::warn!("skipping {}: {:#}", path.display(), e),
        }
    }
    Ok(banks)
}

/// Build the skill-test catalog from every bank under `dir`.
pub fn load_catalog(dir: &Path) -> Result<TestCatalog> {
    let mut entries = Vec::new();
    for path in toml_files(dir)? {
        let parsed = match std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read question bank: {}", path.display()))
            .and_then(|content| parse_file_str(&content, &path))
        {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("skipping {}: {:#}", path.display(), e);
                continue;
            }
        };

        let bank = parsed.bank;
        entries.push(CatalogEntry {
            duration_mins: parsed.duration_mins.unwrap_or(bank.len() as u32),
            question_count: bank.len(),
            id: bank.id,
            title: bank.title,
            description: bank.description,
            difficulty: bank.difficulty,
            recommended: parsed.recommended,
            path,
        });
    }
    Ok(TestCatalog { entries }.sorted())
}

/// A warning from bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Check a structurally valid bank for quality issues.
pub fn validate_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if bank.description.trim().is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "bank has no description".into(),
        });
    }

    for q in bank.questions() {
        let mut warn = |message: String| {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message,
            })
        };

        if q.prompt.trim().is_empty() {
            warn("prompt is empty".into());
        }
        if q.explanation.trim().is_empty() {
            warn("explanation is empty".into());
        }
        if q.options.iter().any(|o| o.trim().is_empty()) {
            warn("one or more options are blank".into());
        }

        let mut seen = HashSet::new();
        for option in &q.options {
            if !seen.insert(option.trim().to_lowercase()) {
                warn(format!("duplicate option: {}", option.trim()));
            }
        }
    }

    warnings
}
