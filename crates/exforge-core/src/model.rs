//! Core data model types for exforge.
//!
//! An exercise is a list of answer fields, a rubric that scores each field,
//! and four reference answer sets (trivial, dummy, canonical, alternate) used
//! both for diagnostics and for the rubric self-tests.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{DefinitionError, InputError};
use crate::rubric::Rubric;
use crate::scoring;

/// A validated answer value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl Value {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Equality that treats `Integer(2)` and `Float(2.0)` as the same answer.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// The shape a field's answer must have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ValueKind {
    Integer,
    Float,
    Boolean,
    Text,
    Choice { options: Vec<String> },
}

impl ValueKind {
    /// Shorthand for a choice field.
    pub fn choice<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValueKind::Choice {
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a learner's raw input into a value of this kind.
    pub fn parse(&self, raw: &str) -> Result<Value, InputError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InputError::Empty);
        }

        match self {
            ValueKind::Integer => trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| InputError::NotAnInteger(trimmed.to_string())),
            ValueKind::Float => match trimmed.parse::<f64>() {
                Ok(x) if x.is_finite() => Ok(Value::Float(x)),
                _ => Err(InputError::NotANumber(trimmed.to_string())),
            },
            ValueKind::Boolean => match trimmed.to_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Ok(Value::Boolean(true)),
                "false" | "no" | "n" | "0" => Ok(Value::Boolean(false)),
                _ => Err(InputError::NotABoolean(trimmed.to_string())),
            },
            ValueKind::Text => Ok(Value::Text(trimmed.to_string())),
            ValueKind::Choice { options } => options
                .iter()
                .find(|o| o.eq_ignore_ascii_case(trimmed))
                .map(|o| Value::Text(o.clone()))
                .ok_or_else(|| InputError::NotAnOption {
                    given: trimmed.to_string(),
                    options: options.clone(),
                }),
        }
    }

    /// Whether an already-typed value fits this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueKind::Integer, Value::Integer(_)) => true,
            (ValueKind::Float, Value::Integer(_)) => true,
            (ValueKind::Float, Value::Float(x)) => x.is_finite(),
            (ValueKind::Boolean, Value::Boolean(_)) => true,
            (ValueKind::Text, Value::Text(_)) => true,
            (ValueKind::Choice { options }, Value::Text(s)) => options.contains(s),
            _ => false,
        }
    }

    /// A minimal well-formed value, used when the author declares no trivial input.
    pub fn trivial_default(&self) -> Value {
        match self {
            ValueKind::Integer => Value::Integer(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Boolean => Value::Boolean(false),
            ValueKind::Text => Value::Text("x".into()),
            ValueKind::Choice { options } => {
                Value::Text(options.first().cloned().unwrap_or_default())
            }
        }
    }

    /// A well-formed value that differs from `solution`, used when the
    /// author declares no dummy input.
    pub fn dummy_for(&self, solution: &Value) -> Value {
        match (self, solution) {
            (ValueKind::Choice { options }, Value::Text(s)) => options
                .iter()
                .find(|o| *o != s)
                .map(|o| Value::Text(o.clone()))
                .unwrap_or_else(|| solution.clone()),
            (_, Value::Integer(n)) if *self == ValueKind::Float => Value::Float(*n as f64 + 1.0),
            (_, Value::Integer(n)) => Value::Integer(n.wrapping_add(1)),
            (_, Value::Float(x)) => Value::Float(x + 1.0),
            (_, Value::Boolean(b)) => Value::Boolean(!b),
            (_, Value::Text(s)) if s == "dummy" => Value::Text("not dummy".into()),
            (_, Value::Text(_)) => Value::Text("dummy".into()),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Integer => write!(f, "whole number"),
            ValueKind::Float => write!(f, "number"),
            ValueKind::Boolean => write!(f, "yes/no"),
            ValueKind::Text => write!(f, "text"),
            ValueKind::Choice { options } => write!(f, "one of: {}", options.join(", ")),
        }
    }
}

/// What the rubric should award the trivial input, as declared by the author.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "expect", content = "score", rename_all = "snake_case")]
pub enum TrivialExpectation {
    /// Full credit.
    #[default]
    Full,
    /// At least this many points.
    AtLeast(f64),
    /// Exactly this many points.
    Exactly(f64),
    /// No expectation; the trivial input is not self-tested.
    Unchecked,
}

impl TrivialExpectation {
    /// Whether `score` out of `max_score` satisfies the expectation.
    pub fn is_met(&self, score: f64, max_score: f64) -> bool {
        match self {
            TrivialExpectation::Full => score >= max_score,
            TrivialExpectation::AtLeast(min) => score >= *min,
            TrivialExpectation::Exactly(expected) => (score - expected).abs() < f64::EPSILON,
            TrivialExpectation::Unchecked => true,
        }
    }
}

impl fmt::Display for TrivialExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrivialExpectation::Full => write!(f, "full credit"),
            TrivialExpectation::AtLeast(min) => write!(f, "at least {min}"),
            TrivialExpectation::Exactly(expected) => write!(f, "exactly {expected}"),
            TrivialExpectation::Unchecked => write!(f, "anything"),
        }
    }
}

/// One named answer slot of an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Identifier, unique within the exercise.
    pub id: String,
    /// Prompt text shown to the learner.
    pub label: String,
    /// Expected answer shape.
    pub kind: ValueKind,
    /// Weight of this field in the total score.
    pub max_score: f64,
    /// Author's expectation for the trivial input.
    #[serde(default)]
    pub trivial_expectation: TrivialExpectation,
    /// The rubric does not need to reject the dummy input for this field.
    #[serde(default)]
    pub rubric_agnostic: bool,
}

impl FieldSpec {
    pub fn new(id: impl Into<String>, kind: ValueKind) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            kind,
            max_score: 1.0,
            trivial_expectation: TrivialExpectation::default(),
            rubric_agnostic: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_max_score(mut self, max_score: f64) -> Self {
        self.max_score = max_score;
        self
    }

    pub fn expect_trivial(mut self, expectation: TrivialExpectation) -> Self {
        self.trivial_expectation = expectation;
        self
    }

    pub fn rubric_agnostic(mut self) -> Self {
        self.rubric_agnostic = true;
        self
    }
}

/// A set of answers keyed by field id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<String, Value>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Signature of a seeded reference-input generator.
pub type GeneratorFn = dyn Fn(&mut StdRng) -> AnswerSet + Send + Sync;

/// Where a reference answer set comes from.
#[derive(Clone)]
pub enum ReferenceInput {
    /// The same answers every time.
    Fixed(AnswerSet),
    /// Answers drawn from a seeded generator.
    Generated(Arc<GeneratorFn>),
}

impl ReferenceInput {
    pub fn generated<F>(generator: F) -> Self
    where
        F: Fn(&mut StdRng) -> AnswerSet + Send + Sync + 'static,
    {
        ReferenceInput::Generated(Arc::new(generator))
    }

    fn produce(&self, rng: &mut StdRng) -> AnswerSet {
        match self {
            ReferenceInput::Fixed(answers) => answers.clone(),
            ReferenceInput::Generated(generator) => generator(rng),
        }
    }
}

impl From<AnswerSet> for ReferenceInput {
    fn from(answers: AnswerSet) -> Self {
        ReferenceInput::Fixed(answers)
    }
}

impl fmt::Debug for ReferenceInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceInput::Fixed(answers) => f.debug_tuple("Fixed").field(answers).finish(),
            ReferenceInput::Generated(_) => f.write_str("Generated(..)"),
        }
    }
}

/// The four reference answer sets of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSnapshot {
    pub trivial_input: AnswerSet,
    pub dummy_input: AnswerSet,
    pub the_solution: AnswerSet,
    pub a_solution: AnswerSet,
}

impl ReferenceSnapshot {
    /// The snapshot sets labelled for diagnostics, solutions first.
    pub fn labelled(&self) -> [(&'static str, &AnswerSet); 4] {
        [
            ("the solution", &self.the_solution),
            ("a solution", &self.a_solution),
            ("trivial input", &self.trivial_input),
            ("dummy input", &self.dummy_input),
        ]
    }
}

/// Independent random stream per reference input, derived from the attempt seed.
fn stream(seed: u64, index: u64) -> StdRng {
    StdRng::seed_from_u64(seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// An author-defined exercise.
#[derive(Clone)]
pub struct ExerciseDefinition {
    id: String,
    title: String,
    preamble: String,
    tags: Vec<String>,
    fields: Vec<FieldSpec>,
    rubric: Arc<dyn Rubric>,
    trivial_input: Option<ReferenceInput>,
    dummy_input: Option<ReferenceInput>,
    the_solution: ReferenceInput,
    a_solution: Option<ReferenceInput>,
}

impl ExerciseDefinition {
    pub fn builder(id: impl Into<String>, title: impl Into<String>) -> ExerciseBuilder {
        ExerciseBuilder::new(id, title)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Fields in declared order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn field_ids(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.id.clone()).collect()
    }

    pub fn rubric(&self) -> &dyn Rubric {
        self.rubric.as_ref()
    }

    pub fn max_total_score(&self) -> f64 {
        self.fields.iter().map(|f| f.max_score).sum()
    }

    /// Produce the reference answer sets for `seed`.
    ///
    /// Trivial and dummy inputs are completed per field from the field kind
    /// when the author leaves a field out.
    pub fn snapshot(&self, seed: u64) -> ReferenceSnapshot {
        let the_solution = self.the_solution.produce(&mut stream(seed, 3));
        let a_solution = match &self.a_solution {
            Some(input) => input.produce(&mut stream(seed, 4)),
            None => the_solution.clone(),
        };

        let mut trivial_input = self
            .trivial_input
            .as_ref()
            .map(|input| input.produce(&mut stream(seed, 1)))
            .unwrap_or_default();
        let mut dummy_input = self
            .dummy_input
            .as_ref()
            .map(|input| input.produce(&mut stream(seed, 2)))
            .unwrap_or_default();

        for field in &self.fields {
            if !trivial_input.contains(&field.id) {
                trivial_input.insert(field.id.clone(), field.kind.trivial_default());
            }
            if !dummy_input.contains(&field.id) {
                if let Some(solution) = the_solution.get(&field.id) {
                    dummy_input.insert(field.id.clone(), field.kind.dummy_for(solution));
                }
            }
        }

        ReferenceSnapshot {
            trivial_input,
            dummy_input,
            the_solution,
            a_solution,
        }
    }

    /// Check that every reference set covers exactly the declared fields with
    /// well-typed values.
    pub fn check_references(&self, snapshot: &ReferenceSnapshot) -> Result<(), DefinitionError> {
        for (input, answers) in snapshot.labelled() {
            for (field_id, value) in answers.iter() {
                let Some(field) = self.field(field_id) else {
                    return Err(DefinitionError::UnknownReferenceField {
                        input,
                        field: field_id.clone(),
                    });
                };
                if !field.kind.accepts(value) {
                    return Err(DefinitionError::IllTypedReference {
                        input,
                        field: field_id.clone(),
                        value: value.to_string(),
                    });
                }
            }
            if let Some(missing) = self.fields.iter().find(|f| !answers.contains(&f.id)) {
                return Err(DefinitionError::IncompleteReference {
                    input,
                    field: missing.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Check that the rubric gives the canonical solution full marks, without
    /// a defect, on every field.
    pub fn check_rubric(&self, snapshot: &ReferenceSnapshot) -> Result<(), DefinitionError> {
        for field in &self.fields {
            let outcome = scoring::score_field(self, field, snapshot.the_solution.get(&field.id));
            let reason = match outcome.defect {
                Some(defect) => defect.message,
                None if outcome.score < outcome.max_score => {
                    format!("scored {} of {}", outcome.score, outcome.max_score)
                }
                None => continue,
            };
            return Err(DefinitionError::RubricRejectsSolution {
                field: field.id.clone(),
                reason,
            });
        }
        Ok(())
    }

    /// Snapshot the reference inputs for `seed` and check their shape.
    ///
    /// The rubric is not consulted: a rubric defect surfaces when the
    /// attempt is scored, not before the learner is prompted.
    pub fn prepare(&self, seed: u64) -> Result<ReferenceSnapshot, DefinitionError> {
        let snapshot = self.snapshot(seed);
        self.check_references(&snapshot)?;
        Ok(snapshot)
    }

    /// Shape check plus full marks for the canonical solution; returns the
    /// snapshot it validated.
    pub fn check(&self, seed: u64) -> Result<ReferenceSnapshot, DefinitionError> {
        let snapshot = self.prepare(seed)?;
        self.check_rubric(&snapshot)?;
        Ok(snapshot)
    }
}

impl fmt::Debug for ExerciseDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExerciseDefinition")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("fields", &self.fields)
            .field("the_solution", &self.the_solution)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ExerciseDefinition`].
pub struct ExerciseBuilder {
    id: String,
    title: String,
    preamble: String,
    tags: Vec<String>,
    fields: Vec<FieldSpec>,
    rubric: Option<Arc<dyn Rubric>>,
    trivial_input: Option<ReferenceInput>,
    dummy_input: Option<ReferenceInput>,
    the_solution: Option<ReferenceInput>,
    a_solution: Option<ReferenceInput>,
}

impl ExerciseBuilder {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            preamble: String::new(),
            tags: Vec::new(),
            fields: Vec::new(),
            rubric: None,
            trivial_input: None,
            dummy_input: None,
            the_solution: None,
            a_solution: None,
        }
    }

    pub fn preamble(mut self, text: impl Into<String>) -> Self {
        self.preamble = text.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn rubric(mut self, rubric: impl Rubric + 'static) -> Self {
        self.rubric = Some(Arc::new(rubric));
        self
    }

    pub fn trivial_input(mut self, input: impl Into<ReferenceInput>) -> Self {
        self.trivial_input = Some(input.into());
        self
    }

    pub fn dummy_input(mut self, input: impl Into<ReferenceInput>) -> Self {
        self.dummy_input = Some(input.into());
        self
    }

    pub fn the_solution(mut self, input: impl Into<ReferenceInput>) -> Self {
        self.the_solution = Some(input.into());
        self
    }

    pub fn a_solution(mut self, input: impl Into<ReferenceInput>) -> Self {
        self.a_solution = Some(input.into());
        self
    }

    /// Validate the static invariants and produce the definition.
    pub fn build(self) -> Result<ExerciseDefinition, DefinitionError> {
        if self.id.trim().is_empty() {
            return Err(DefinitionError::EmptyId);
        }
        if self.fields.is_empty() {
            return Err(DefinitionError::NoFields(self.id));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.id.as_str()) {
                return Err(DefinitionError::DuplicateField(field.id.clone()));
            }
            if !field.max_score.is_finite() || field.max_score < 0.0 {
                return Err(DefinitionError::InvalidMaxScore {
                    field: field.id.clone(),
                    max_score: field.max_score,
                });
            }
            if let ValueKind::Choice { options } = &field.kind {
                if options.is_empty() {
                    return Err(DefinitionError::NoOptions(field.id.clone()));
                }
            }
        }

        let Some(rubric) = self.rubric else {
            return Err(DefinitionError::MissingRubric(self.id));
        };
        let Some(the_solution) = self.the_solution else {
            return Err(DefinitionError::MissingSolution(self.id));
        };

        Ok(ExerciseDefinition {
            id: self.id,
            title: self.title,
            preamble: self.preamble,
            tags: self.tags,
            fields: self.fields,
            rubric,
            trivial_input: self.trivial_input,
            dummy_input: self.dummy_input,
            the_solution,
            a_solution: self.a_solution,
        })
    }
}

/// An ordered in-memory collection of exercise definitions.
#[derive(Debug, Clone, Default)]
pub struct ExercisePool {
    exercises: Vec<Arc<ExerciseDefinition>>,
}

impl ExercisePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, exercise: ExerciseDefinition) {
        self.exercises.push(Arc::new(exercise));
    }

    pub fn get(&self, id: &str) -> Option<&Arc<ExerciseDefinition>> {
        self.exercises.iter().find(|e| e.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ExerciseDefinition>> {
        self.exercises.iter()
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Keep exercises whose id or one of whose tags contains any pattern.
    /// An empty pattern list keeps everything.
    pub fn filter(&self, patterns: &[String]) -> ExercisePool {
        if patterns.is_empty() {
            return self.clone();
        }
        let exercises = self
            .exercises
            .iter()
            .filter(|e| {
                patterns.iter().any(|p| {
                    e.id().contains(p.as_str()) || e.tags().iter().any(|t| t.contains(p.as_str()))
                })
            })
            .cloned()
            .collect();
        ExercisePool { exercises }
    }
}

impl FromIterator<ExerciseDefinition> for ExercisePool {
    fn from_iter<T: IntoIterator<Item = ExerciseDefinition>>(iter: T) -> Self {
        Self {
            exercises: iter.into_iter().map(Arc::new).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ExercisePool {
    type Item = &'a Arc<ExerciseDefinition>;
    type IntoIter = std::slice::Iter<'a, Arc<ExerciseDefinition>>;

    fn into_iter(self) -> Self::IntoIter {
        self.exercises.iter()
    }
}
