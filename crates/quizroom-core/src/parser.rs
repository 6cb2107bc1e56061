//! TOML question bank parser.
//!
//! Loads curriculum question banks from TOML files and directories, and
//! validates them.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{option_letter, Question, QuestionKind};

/// A curriculum question bank for one subject and grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub subject: String,
    pub grade: String,
    #[serde(default)]
    pub entries: Vec<BankEntry>,
}

/// A bank question together with the topic it is filed under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankEntry {
    pub topic: String,
    pub question: Question,
}

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
    name: String,
    #[serde(default)]
    description: String,
    subject: String,
    grade: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    #[serde(default)]
    topic: String,
    content: String,
    kind: String,
    #[serde(default)]
    options: Vec<String>,
    answer: String,
    #[serde(default = "default_marks")]
    marks: u32,
}

fn default_marks() -> u32 {
    1
}

/// Canonical answer token for a question kind.
fn canonical_answer(kind: QuestionKind, answer: &str) -> String {
    let trimmed = answer.trim();
    match kind {
        QuestionKind::MultipleChoice => trimmed.to_uppercase(),
        QuestionKind::TrueFalse => match trimmed.to_lowercase().as_str() {
            "true" | "t" => "True".to_string(),
            "false" | "f" => "False".to_string(),
            _ => trimmed.to_string(),
        },
        QuestionKind::ShortAnswer => trimmed.to_string(),
    }
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn parse_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank` (useful for testing).
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let entries = parsed
        .questions
        .into_iter()
        .map(|q| {
            let kind: QuestionKind = q
                .kind
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question {}: {}", q.id, e))?;

            Ok(BankEntry {
                topic: q.topic,
                question: Question {
                    correct_answer: canonical_answer(kind, &q.answer),
                    id: q.id,
                    content: q.content,
                    kind,
                    options: q.options,
                    marks: q.marks,
                },
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QuestionBank {
        id: parsed.bank.id,
        name: parsed.bank.name,
        description: parsed.bank.description,
        subject: parsed.bank.subject,
        grade: parsed.bank.grade,
        entries,
    })
}

/// Recursively load all `.toml` question banks from a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// Load a bank file, or every bank under a directory.
pub fn load_banks(path: &Path) -> Result<Vec<QuestionBank>> {
    if path.is_dir() {
        load_bank_directory(path)
    } else {
        Ok(vec![parse_bank(path)?])
    }
}

/// A warning from bank or question validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Check a question list for problems that would make it unusable in a test.
pub fn validate_questions(questions: &[Question]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut seen_ids = std::collections::HashSet::new();

    for q in questions {
        let mut warn = |message: String| {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message,
            })
        };

        if !seen_ids.insert(&q.id) {
            warn(format!("duplicate question ID: {}", q.id));
        }
        if q.content.trim().is_empty() {
            warn("content is empty".into());
        }
        if q.marks == 0 {
            warn("marks must be at least 1".into());
        }

        match q.kind {
            QuestionKind::MultipleChoice => {
                if q.options.is_empty() {
                    warn("multiple choice question has no options".into());
                } else {
                    let valid = (0..q.options.len())
                        .map(option_letter)
                        .any(|letter| letter == q.correct_answer);
                    if !valid {
                        warn(format!(
                            "answer '{}' is not one of the option letters A..{}",
                            q.correct_answer,
                            option_letter(q.options.len() - 1)
                        ));
                    }
                }
            }
            QuestionKind::TrueFalse => {
                if q.correct_answer != "True" && q.correct_answer != "False" {
                    warn(format!(
                        "true/false answer must be True or False, got '{}'",
                        q.correct_answer
                    ));
                }
                if !q.options.is_empty() {
                    warn("options are only allowed on multiple choice questions".into());
                }
            }
            QuestionKind::ShortAnswer => {
                if q.correct_answer.trim().is_empty() {
                    warn("short answer question has an empty answer".into());
                }
                if !q.options.is_empty() {
                    warn("options are only allowed on multiple choice questions".into());
                }
            }
        }
    }

    warnings
}

/// Validate a question bank for common issues.
pub fn validate_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let questions: Vec<Question> = bank.entries.iter().map(|e| e.question.clone()).collect();
    let mut warnings = validate_questions(&questions);

    for entry in &bank.entries {
        if entry.topic.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(entry.question.id.clone()),
                message: "no topic set; the question is only used as filler".into(),
            });
        }
    }

    if bank.entries.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "bank has no questions".into(),
        });
    }

    warnings
}
