//! Error types for exercise attempts.
//!
//! Each enum covers one class of failure, and each class is recovered at a
//! different level: input errors trigger a re-ask, rubric errors degrade a
//! single field to zero credit, frontend errors end the attempt.

use thiserror::Error;

/// A raw answer that does not have the shape the field expects.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// Nothing was entered.
    #[error("no input given")]
    Empty,

    /// The field expects a whole number.
    #[error("'{0}' is not a whole number")]
    NotAnInteger(String),

    /// The field expects a finite decimal number.
    #[error("'{0}' is not a number")]
    NotANumber(String),

    /// The field expects yes/no.
    #[error("'{0}' is not a yes/no answer (use yes, no, true or false)")]
    NotABoolean(String),

    /// The field expects one of a fixed set of options.
    #[error("'{given}' is not one of: {}", .options.join(", "))]
    NotAnOption { given: String, options: Vec<String> },

    /// The frontend gave up waiting for this field.
    #[error("no answer was given in time")]
    TimedOut,
}

/// A rubric that misbehaved on well-typed input.
///
/// These are authoring defects in the exercise definition, not learner
/// mistakes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RubricError {
    /// The rubric returned an error of its own.
    #[error("rubric failed: {0}")]
    Failed(String),

    /// The rubric panicked.
    #[error("rubric panicked: {0}")]
    Panicked(String),

    /// The rubric produced NaN or infinity.
    #[error("rubric returned a non-finite score ({0})")]
    NonFinite(f64),

    /// The rubric awarded less than zero or more than the maximum.
    #[error("rubric returned score {score} outside 0..={max_score}")]
    OutOfRange { score: f64, max_score: f64 },

    /// The rubric disagrees with the field's declared weight.
    #[error("rubric reported max score {reported}, field declares {declared}")]
    MaxScoreMismatch { reported: f64, declared: f64 },
}

impl RubricError {
    /// Convenience constructor for author-raised failures.
    pub fn failed(message: impl Into<String>) -> Self {
        RubricError::Failed(message.into())
    }
}

/// A presentation adapter failed to render or collect.
#[derive(Debug, Error)]
pub enum FrontendError {
    /// Underlying I/O failure.
    #[error("frontend I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input stream ended while an answer was expected.
    #[error("input closed while waiting for field '{0}'")]
    Closed(String),

    /// Any other adapter-specific failure.
    #[error("frontend failure: {0}")]
    Other(String),
}

/// An exercise definition that violates its invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error("exercise '{0}' declares no fields")]
    NoFields(String),

    #[error("exercise id must not be empty")]
    EmptyId,

    #[error("duplicate field id '{0}'")]
    DuplicateField(String),

    #[error("field '{field}' has invalid max score {max_score}")]
    InvalidMaxScore { field: String, max_score: f64 },

    #[error("choice field '{0}' offers no options")]
    NoOptions(String),

    #[error("exercise '{0}' has no rubric")]
    MissingRubric(String),

    #[error("exercise '{0}' has no canonical solution")]
    MissingSolution(String),

    #[error("{input} is missing field '{field}'")]
    IncompleteReference { input: &'static str, field: String },

    #[error("{input} names unknown field '{field}'")]
    UnknownReferenceField { input: &'static str, field: String },

    #[error("{input} value {value} does not fit field '{field}'")]
    IllTypedReference {
        input: &'static str,
        field: String,
        value: String,
    },

    #[error("rubric rejects the canonical solution for field '{field}': {reason}")]
    RubricRejectsSolution { field: String, reason: String },
}

/// Why an attempt did not reach completion.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The definition was refused before the attempt started.
    #[error("invalid exercise definition: {0}")]
    Definition(#[from] DefinitionError),

    /// The frontend failed; the attempt is aborted.
    #[error("frontend failed{}: {source}", .field.as_deref().map(|f| format!(" on field '{f}'")).unwrap_or_default())]
    Frontend {
        field: Option<String>,
        #[source]
        source: FrontendError,
    },
}
