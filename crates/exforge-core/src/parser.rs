//! TOML answer-sheet parser.
//!
//! An answer sheet holds pre-recorded raw answers for non-interactive runs:
//!
//! ```toml
//! [[attempts]]
//! exercise = "addition"
//! [attempts.answers]
//! sum = "5"
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::ExercisePool;
use crate::validation::ValidationWarning;

/// Intermediate TOML structure for parsing answer sheets.
#[derive(Debug, Deserialize)]
struct TomlAnswerFile {
    #[serde(default)]
    attempts: Vec<TomlAttempt>,
}

#[derive(Debug, Deserialize)]
struct TomlAttempt {
    exercise: String,
    #[serde(default)]
    answers: BTreeMap<String, toml::Value>,
}

/// Raw answers for one exercise, keyed by field id.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetAttempt {
    pub exercise: String,
    pub answers: BTreeMap<String, String>,
}

/// A parsed answer sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSheet {
    pub source: PathBuf,
    pub attempts: Vec<SheetAttempt>,
}

impl AnswerSheet {
    /// The first entry for `exercise`, if any.
    pub fn for_exercise(&self, exercise: &str) -> Option<&SheetAttempt> {
        self.attempts.iter().find(|a| a.exercise == exercise)
    }
}

/// Parse an answer sheet file.
pub fn parse_answer_sheet(path: &Path) -> Result<AnswerSheet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answer sheet: {}", path.display()))?;

    parse_answer_sheet_str(&content, path)
}

/// Parse an answer sheet from a string (useful for testing).
pub fn parse_answer_sheet_str(content: &str, source_path: &Path) -> Result<AnswerSheet> {
    let parsed: TomlAnswerFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let attempts = parsed
        .attempts
        .into_iter()
        .map(|a| {
            let answers = a
                .answers
                .into_iter()
                .map(|(field, value)| {
                    let raw = match value {
                        toml::Value::String(s) => s,
                        toml::Value::Integer(n) => n.to_string(),
                        toml::Value::Float(x) => x.to_string(),
                        toml::Value::Boolean(b) => b.to_string(),
                        other => anyhow::bail!(
                            "answer for {}.{} must be a string, number or boolean, got {}",
                            a.exercise,
                            field,
                            other.type_str()
                        ),
                    };
                    Ok((field, raw))
                })
                .collect::<Result<BTreeMap<_, _>>>()?;

            Ok(SheetAttempt {
                exercise: a.exercise,
                answers,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AnswerSheet {
        source: source_path.to_path_buf(),
        attempts,
    })
}

/// Check an answer sheet against the exercises it will be played against.
pub fn validate_answer_sheet(sheet: &AnswerSheet, pool: &ExercisePool) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen = HashSet::new();
    for attempt in &sheet.attempts {
        if !seen.insert(attempt.exercise.as_str()) {
            warnings.push(ValidationWarning::exercise(
                &attempt.exercise,
                "duplicate answer-sheet entry; only the first is used",
            ));
        }
    }

    for attempt in &sheet.attempts {
        let Some(definition) = pool.get(&attempt.exercise) else {
            warnings.push(ValidationWarning::exercise(&attempt.exercise, "unknown exercise"));
            continue;
        };

        for (field_id, raw) in &attempt.answers {
            match definition.field(field_id) {
                None => warnings.push(ValidationWarning::field(
                    &attempt.exercise,
                    field_id,
                    "unknown field",
                )),
                Some(field) => {
                    if let Err(e) = field.kind.parse(raw) {
                        warnings.push(ValidationWarning::field(
                            &attempt.exercise,
                            field_id,
                            format!("answer will be rejected: {e}"),
                        ));
                    }
                }
            }
        }

        for field in definition.fields() {
            if !attempt.answers.contains_key(&field.id) {
                warnings.push(ValidationWarning::field(
                    &attempt.exercise,
                    &field.id,
                    "no answer given; the field will be skipped",
                ));
            }
        }
    }

    warnings
}
