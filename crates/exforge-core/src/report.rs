//! Textual summaries and JSON persistence of result records.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AnswerSet, Value};
use crate::results::{AttemptStatus, ExerciseRecord, NoAnswerReason};

impl ExerciseRecord {
    /// Save the record as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize record")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write record to {}", path.display()))?;
        Ok(())
    }

    /// Load a record from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read record from {}", path.display()))?;
        let record: ExerciseRecord =
            serde_json::from_str(&content).context("failed to parse record JSON")?;
        Ok(record)
    }
}

fn answer_set(set: &AnswerSet) -> String {
    let parts: Vec<String> = set.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{{{}}}", parts.join(", "))
}

fn solution(set: &BTreeMap<String, Option<Value>>) -> String {
    let parts: Vec<String> = set
        .iter()
        .map(|(k, v)| match v {
            Some(v) => format!("{k}={v}"),
            None => format!("{k}=<no answer>"),
        })
        .collect();
    format!("{{{}}}", parts.join(", "))
}

/// Render a record the way a learner sees it after an attempt.
///
/// With `debug`, the four reference inputs are listed first.
pub fn format_summary(record: &ExerciseRecord, debug: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "== {} ({}) [{}] ==",
        record.title(),
        record.exercise_id(),
        record.status().label()
    );

    if debug {
        let _ = writeln!(out, "seed: {}", record.seed());
        let _ = writeln!(out, "trivial input: {}", answer_set(record.trivial_input()));
        let _ = writeln!(out, "dummy input: {}", answer_set(record.dummy_input()));
        let _ = writeln!(out, "the solution: {}", answer_set(record.the_solution()));
        let _ = writeln!(out, "a solution: {}", answer_set(record.a_solution()));
    }

    let answers: AnswerSet = record
        .answers()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let _ = writeln!(out, "answers: {}", answer_set(&answers));

    match record.status() {
        AttemptStatus::Completed => {
            if let Some(scored) = record.solution() {
                let _ = writeln!(out, "solution: {}", solution(scored));
            }
            let _ = writeln!(out, "scores:");
            for field in record.ifields() {
                let score = record.scores().get(field).copied().unwrap_or_default();
                let max = record.max_scores().get(field).copied().unwrap_or_default();
                let note = match record.no_answers().get(field) {
                    Some(reason) => format!(" (no answer: {})", no_answer_label(reason)),
                    None => String::new(),
                };
                let _ = writeln!(out, "  {field}: {score}/{max}{note}");
            }
            let _ = writeln!(
                out,
                "total score: {}/{}",
                record.total_score(),
                record.max_total_score()
            );
            for defect in record.defects() {
                let _ = writeln!(
                    out,
                    "rubric defect on '{}' for {}: {}",
                    defect.field, defect.value, defect.message
                );
            }
        }
        AttemptStatus::Failed { error } => {
            let _ = writeln!(out, "attempt failed: {error}");
        }
        AttemptStatus::Cancelled => {
            let _ = writeln!(out, "attempt cancelled before scoring");
        }
        AttemptStatus::InProgress => {}
    }

    out
}

fn no_answer_label(reason: &NoAnswerReason) -> String {
    match reason {
        NoAnswerReason::Skipped => "skipped".into(),
        NoAnswerReason::RetryCapExceeded { attempts } => {
            format!("{attempts} malformed inputs")
        }
    }
}

/// All records produced by one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub records: Vec<ExerciseRecord>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl SessionReport {
    pub fn new(records: Vec<ExerciseRecord>, duration_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            records,
            duration_ms,
        }
    }

    fn count(&self, pred: impl Fn(&AttemptStatus) -> bool) -> usize {
        self.records.iter().filter(|r| pred(r.status())).count()
    }

    pub fn completed(&self) -> usize {
        self.count(|s| *s == AttemptStatus::Completed)
    }

    pub fn cancelled(&self) -> usize {
        self.count(|s| *s == AttemptStatus::Cancelled)
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, AttemptStatus::Failed { .. }))
    }

    /// Sum over completed records.
    pub fn total_score(&self) -> f64 {
        self.records
            .iter()
            .filter(|r| r.is_sealed())
            .map(ExerciseRecord::total_score)
            .sum()
    }

    /// Sum over completed records.
    pub fn max_total_score(&self) -> f64 {
        self.records
            .iter()
            .filter(|r| r.is_sealed())
            .map(ExerciseRecord::max_total_score)
            .sum()
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize session")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write session to {}", path.display()))?;
        Ok(())
    }

    /// Format the session as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} completed, {} cancelled, {} failed; total {}/{}\n\n",
            self.completed(),
            self.cancelled(),
            self.failed(),
            self.total_score(),
            self.max_total_score()
        ));

        if !self.records.is_empty() {
            md.push_str("| Exercise | Status | Score | Max |\n");
            md.push_str("|----------|--------|-------|-----|\n");
            for r in &self.records {
                let (score, max) = if r.is_sealed() {
                    (r.total_score().to_string(), r.max_total_score().to_string())
                } else {
                    ("-".to_string(), "-".to_string())
                };
                md.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    r.exercise_id(),
                    r.status().label(),
                    score,
                    max
                ));
            }
        }

        md
    }
}
