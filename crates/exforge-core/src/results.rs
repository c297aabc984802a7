//! The result record of one exercise attempt.
//!
//! A record is created when an attempt starts, grows one validated field at
//! a time, and is sealed once scored. After that every field is read-only;
//! the mutation methods are crate-private and refuse to touch a finished
//! record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AnswerSet, ExerciseDefinition, ReferenceSnapshot, Value};
use crate::scoring::{RubricDefect, ScoreSheet};

/// Lifecycle state of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Answers are still being collected.
    InProgress,
    /// Every field was handled and the record is scored and sealed.
    Completed,
    /// The learner quit; the record holds the last fully recorded state.
    Cancelled,
    /// Something failed (frontend I/O); the record is not sealed.
    Failed { error: String },
}

impl AttemptStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Cancelled => "cancelled",
            AttemptStatus::Failed { .. } => "failed",
        }
    }
}

/// Why a field has no answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NoAnswerReason {
    /// The learner chose to skip the field.
    Skipped,
    /// Too many malformed inputs in a row.
    RetryCapExceeded { attempts: u32 },
}

/// A malformed input that was rejected and re-asked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputNote {
    pub field: String,
    pub raw: Option<String>,
    pub message: String,
}

/// The record of one attempt at one exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    id: Uuid,
    exercise_id: String,
    title: String,
    seed: u64,
    started_at: DateTime<Utc>,
    #[serde(default)]
    finished_at: Option<DateTime<Utc>>,
    status: AttemptStatus,
    ifields: Vec<String>,
    trivial_input: AnswerSet,
    dummy_input: AnswerSet,
    the_solution: AnswerSet,
    a_solution: AnswerSet,
    answers: BTreeMap<String, Value>,
    #[serde(default)]
    no_answers: BTreeMap<String, NoAnswerReason>,
    #[serde(default)]
    input_errors: Vec<InputNote>,
    #[serde(default)]
    solution: Option<BTreeMap<String, Option<Value>>>,
    #[serde(default)]
    scores: BTreeMap<String, f64>,
    #[serde(default)]
    max_scores: BTreeMap<String, f64>,
    #[serde(default)]
    total_score: f64,
    #[serde(default)]
    max_total_score: f64,
    #[serde(default)]
    defects: Vec<RubricDefect>,
}

impl ExerciseRecord {
    /// Start a record for `definition` with the given reference snapshot.
    pub(crate) fn start(definition: &ExerciseDefinition, seed: u64, snapshot: ReferenceSnapshot) -> Self {
        Self {
            id: Uuid::new_v4(),
            exercise_id: definition.id().to_string(),
            title: definition.title().to_string(),
            seed,
            started_at: Utc::now(),
            finished_at: None,
            status: AttemptStatus::InProgress,
            ifields: definition.field_ids(),
            trivial_input: snapshot.trivial_input,
            dummy_input: snapshot.dummy_input,
            the_solution: snapshot.the_solution,
            a_solution: snapshot.a_solution,
            answers: BTreeMap::new(),
            no_answers: BTreeMap::new(),
            input_errors: Vec::new(),
            solution: None,
            scores: BTreeMap::new(),
            max_scores: BTreeMap::new(),
            total_score: 0.0,
            max_total_score: 0.0,
            defects: Vec::new(),
        }
    }

    fn ensure_open(&self) -> bool {
        let open = self.status == AttemptStatus::InProgress;
        if !open {
            tracing::warn!(record = %self.id, "ignoring mutation of a finished record");
        }
        open
    }

    /// Store a validated answer, replacing any earlier answer for the field.
    pub(crate) fn record_answer(&mut self, field: &str, value: Value) {
        if self.ensure_open() {
            self.no_answers.remove(field);
            self.answers.insert(field.to_string(), value);
        }
    }

    pub(crate) fn record_no_answer(&mut self, field: &str, reason: NoAnswerReason) {
        if self.ensure_open() {
            self.answers.remove(field);
            self.no_answers.insert(field.to_string(), reason);
        }
    }

    pub(crate) fn note_input_error(&mut self, note: InputNote) {
        if self.ensure_open() {
            self.input_errors.push(note);
        }
    }

    /// The answer set to score: submitted answers, with the "no answer"
    /// sentinel (`None`) for every field without one.
    pub(crate) fn finalized_solution(&self) -> BTreeMap<String, Option<Value>> {
        self.ifields
            .iter()
            .map(|f| (f.clone(), self.answers.get(f).cloned()))
            .collect()
    }

    /// Attach scores and close the record.
    pub(crate) fn seal(&mut self, solution: BTreeMap<String, Option<Value>>, sheet: &ScoreSheet) {
        if !self.ensure_open() {
            return;
        }
        self.solution = Some(solution);
        self.scores = sheet.scores();
        self.max_scores = sheet.max_scores();
        self.total_score = sheet.total_score();
        self.max_total_score = sheet.max_total_score();
        self.defects = sheet.defects().cloned().collect();
        self.status = AttemptStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// Close the record without scoring it.
    pub(crate) fn abort(&mut self, status: AttemptStatus) {
        if self.ensure_open() && status.is_finished() {
            self.status = status;
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn exercise_id(&self) -> &str {
        &self.exercise_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Seed the reference inputs were generated from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn status(&self) -> &AttemptStatus {
        &self.status
    }

    pub fn is_sealed(&self) -> bool {
        self.status == AttemptStatus::Completed
    }

    /// Field ids in declared order.
    pub fn ifields(&self) -> &[String] {
        &self.ifields
    }

    pub fn trivial_input(&self) -> &AnswerSet {
        &self.trivial_input
    }

    pub fn dummy_input(&self) -> &AnswerSet {
        &self.dummy_input
    }

    pub fn the_solution(&self) -> &AnswerSet {
        &self.the_solution
    }

    pub fn a_solution(&self) -> &AnswerSet {
        &self.a_solution
    }

    /// Validated answers as submitted.
    pub fn answers(&self) -> &BTreeMap<String, Value> {
        &self.answers
    }

    pub fn no_answers(&self) -> &BTreeMap<String, NoAnswerReason> {
        &self.no_answers
    }

    pub fn input_errors(&self) -> &[InputNote] {
        &self.input_errors
    }

    /// The answer set that was scored; `None` until the record is sealed.
    pub fn solution(&self) -> Option<&BTreeMap<String, Option<Value>>> {
        self.solution.as_ref()
    }

    pub fn scores(&self) -> &BTreeMap<String, f64> {
        &self.scores
    }

    pub fn max_scores(&self) -> &BTreeMap<String, f64> {
        &self.max_scores
    }

    pub fn total_score(&self) -> f64 {
        self.total_score
    }

    pub fn max_total_score(&self) -> f64 {
        self.max_total_score
    }

    pub fn defects(&self) -> &[RubricDefect] {
        &self.defects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldSpec, ValueKind};
    use crate::rubric::{Check, KeyedRubric};
    use crate::scoring::score_answer_set;

    fn definition() -> ExerciseDefinition {
        ExerciseDefinition::builder("pair", "Pair")
            .field(FieldSpec::new("a", ValueKind::Integer))
            .field(FieldSpec::new("b", ValueKind::Integer))
            .rubric(
                KeyedRubric::new()
                    .check("a", Check::Equals(1.into()))
                    .check("b", Check::Equals(2.into())),
            )
            .the_solution(AnswerSet::new().with("a", 1).with("b", 2))
            .build()
            .unwrap()
    }

    fn start() -> (ExerciseDefinition, ExerciseRecord) {
        let def = definition();
        let snapshot = def.snapshot(1);
        let record = ExerciseRecord::start(&def, 1, snapshot);
        (def, record)
    }

    #[test]
    fn new_record_holds_only_snapshots() {
        let (_, record) = start();
        assert_eq!(record.status(), &AttemptStatus::InProgress);
        assert_eq!(record.ifields(), ["a".to_string(), "b".to_string()]);
        assert_eq!(record.the_solution().get("b"), Some(&Value::Integer(2)));
        assert!(record.answers().is_empty());
        assert!(record.solution().is_none());
        assert!(record.scores().is_empty());
    }

    #[test]
    fn solution_fills_missing_fields_with_sentinel() {
        let (_, mut record) = start();
        record.record_answer("a", Value::Integer(1));
        record.record_no_answer("b", NoAnswerReason::Skipped);
        let solution = record.finalized_solution();
        assert_eq!(solution.get("a"), Some(&Some(Value::Integer(1))));
        assert_eq!(solution.get("b"), Some(&None));
    }

    #[test]
    fn sealed_record_is_read_only() {
        let (def, mut record) = start();
        record.record_answer("a", Value::Integer(1));
        record.record_answer("b", Value::Integer(3));
        let solution = record.finalized_solution();
        let sheet = score_answer_set(&def, &solution);
        record.seal(solution, &sheet);

        assert!(record.is_sealed());
        assert_eq!(record.total_score(), 1.0);
        assert_eq!(record.max_total_score(), 2.0);

        record.record_answer("b", Value::Integer(2));
        record.abort(AttemptStatus::Cancelled);
        assert_eq!(record.answers().get("b"), Some(&Value::Integer(3)));
        assert_eq!(record.status(), &AttemptStatus::Completed);
    }

    #[test]
    fn re_answer_overwrites() {
        let (_, mut record) = start();
        record.record_no_answer("a", NoAnswerReason::Skipped);
        record.record_answer("a", Value::Integer(5));
        assert_eq!(record.answers().get("a"), Some(&Value::Integer(5)));
        assert!(record.no_answers().is_empty());
    }
}
