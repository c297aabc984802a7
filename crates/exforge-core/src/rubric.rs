//! The rubric contract and a table-driven rubric for the common cases.
//!
//! A rubric is a pure function from `(field, value)` to a score. It must be
//! deterministic and must not fail on well-typed input; when it does, the
//! failure is an authoring defect recorded against that field only.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RubricError;
use crate::model::{FieldSpec, Value};

/// Points awarded for one field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldScore {
    pub score: f64,
    pub max_score: f64,
}

impl FieldScore {
    pub fn new(score: f64, max_score: f64) -> Self {
        Self { score, max_score }
    }

    /// Full credit for `field`.
    pub fn full(field: &FieldSpec) -> Self {
        Self::new(field.max_score, field.max_score)
    }

    /// No credit for `field`.
    pub fn zero(field: &FieldSpec) -> Self {
        Self::new(0.0, field.max_score)
    }

    /// `fraction` (clamped to `0.0..=1.0`) of the field's weight.
    pub fn fraction(field: &FieldSpec, fraction: f64) -> Self {
        Self::new(field.max_score * fraction.clamp(0.0, 1.0), field.max_score)
    }

    /// Full or zero credit.
    pub fn pass_fail(field: &FieldSpec, passed: bool) -> Self {
        if passed {
            Self::full(field)
        } else {
            Self::zero(field)
        }
    }
}

/// Scores one submitted value for one field.
pub trait Rubric: Send + Sync {
    fn score(&self, field: &FieldSpec, value: &Value) -> Result<FieldScore, RubricError>;
}

impl<F> Rubric for F
where
    F: Fn(&FieldSpec, &Value) -> Result<FieldScore, RubricError> + Send + Sync,
{
    fn score(&self, field: &FieldSpec, value: &Value) -> Result<FieldScore, RubricError> {
        self(field, value)
    }
}

/// A single pass/fail condition on a field's value.
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// The value equals this one (numbers compare across integer/float).
    Equals(Value),
    /// The value equals any of these.
    AnyOf(Vec<Value>),
    /// A number within `tolerance` of `target`.
    Within { target: f64, tolerance: f64 },
    /// Text equal to `expected`, ignoring surrounding whitespace.
    TextMatch {
        expected: String,
        case_sensitive: bool,
    },
}

impl Check {
    fn passes(&self, field: &FieldSpec, value: &Value) -> Result<bool, RubricError> {
        match self {
            Check::Equals(expected) => Ok(value.same_as(expected)),
            Check::AnyOf(accepted) => Ok(accepted.iter().any(|a| value.same_as(a))),
            Check::Within { target, tolerance } => {
                let Some(x) = value.as_f64() else {
                    return Err(RubricError::failed(format!(
                        "field '{}' expects a number, got {value}",
                        field.id
                    )));
                };
                Ok((x - target).abs() <= *tolerance)
            }
            Check::TextMatch {
                expected,
                case_sensitive,
            } => {
                let Some(text) = value.as_text() else {
                    return Err(RubricError::failed(format!(
                        "field '{}' expects text, got {value}",
                        field.id
                    )));
                };
                let text = text.trim();
                Ok(if *case_sensitive {
                    text == expected
                } else {
                    text.eq_ignore_ascii_case(expected)
                })
            }
        }
    }
}

/// Full-or-nothing rubric with one [`Check`] per field id.
#[derive(Debug, Clone, Default)]
pub struct KeyedRubric {
    checks: HashMap<String, Check>,
}

impl KeyedRubric {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(mut self, field: impl Into<String>, check: Check) -> Self {
        self.checks.insert(field.into(), check);
        self
    }
}

impl Rubric for KeyedRubric {
    fn score(&self, field: &FieldSpec, value: &Value) -> Result<FieldScore, RubricError> {
        let check = self
            .checks
            .get(&field.id)
            .ok_or_else(|| RubricError::failed(format!("no check for field '{}'", field.id)))?;
        Ok(FieldScore::pass_fail(field, check.passes(field, value)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueKind;

    fn int_field() -> FieldSpec {
        FieldSpec::new("n", ValueKind::Integer).with_max_score(2.0)
    }

    #[test]
    fn keyed_rubric_equals_and_any_of() {
        let rubric = KeyedRubric::new()
            .check("n", Check::Equals(4.into()))
            .check("f", Check::AnyOf(vec![0.5.into(), 1.into()]));
        let field = int_field();
        assert_eq!(
            rubric.score(&field, &Value::Integer(4)).unwrap(),
            FieldScore::new(2.0, 2.0)
        );
        assert_eq!(
            rubric.score(&field, &Value::Integer(5)).unwrap(),
            FieldScore::new(0.0, 2.0)
        );

        let f = FieldSpec::new("f", ValueKind::Float);
        assert_eq!(rubric.score(&f, &Value::Float(1.0)).unwrap().score, 1.0);
        assert_eq!(rubric.score(&f, &Value::Float(0.25)).unwrap().score, 0.0);
    }

    #[test]
    fn keyed_rubric_within_tolerance() {
        let rubric = KeyedRubric::new().check(
            "x",
            Check::Within {
                target: 1.5,
                tolerance: 0.01,
            },
        );
        let field = FieldSpec::new("x", ValueKind::Float);
        assert_eq!(rubric.score(&field, &Value::Float(1.505)).unwrap().score, 1.0);
        assert_eq!(rubric.score(&field, &Value::Float(1.6)).unwrap().score, 0.0);
        assert!(rubric.score(&field, &Value::Boolean(true)).is_err());
    }

    #[test]
    fn keyed_rubric_text_match() {
        let rubric = KeyedRubric::new().check(
            "t",
            Check::TextMatch {
                expected: "Paris".into(),
                case_sensitive: false,
            },
        );
        let field = FieldSpec::new("t", ValueKind::Text);
        assert_eq!(rubric.score(&field, &"paris".into()).unwrap().score, 1.0);
        assert_eq!(rubric.score(&field, &"Rome".into()).unwrap().score, 0.0);
    }

    #[test]
    fn keyed_rubric_missing_check_is_an_error() {
        let rubric = KeyedRubric::new();
        assert!(matches!(
            rubric.score(&int_field(), &Value::Integer(1)),
            Err(RubricError::Failed(_))
        ));
    }

    #[test]
    fn closures_are_rubrics() {
        let rubric = |field: &FieldSpec, value: &Value| -> Result<FieldScore, RubricError> {
            let n = value.as_f64().unwrap_or_default();
            Ok(FieldScore::fraction(field, n / 10.0))
        };
        assert_eq!(
            rubric.score(&int_field(), &Value::Integer(5)).unwrap(),
            FieldScore::new(1.0, 2.0)
        );
        assert_eq!(
            rubric.score(&int_field(), &Value::Integer(50)).unwrap(),
            FieldScore::new(2.0, 2.0)
        );
    }
}
