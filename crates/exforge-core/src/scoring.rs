//! Pure scoring of answer sets against an exercise's rubric.
//!
//! Scoring never fails as a whole. A missing answer is worth nothing, and a
//! rubric that errors, panics, or returns nonsense is recorded as a defect
//! against that one field, which then scores `0/max_score`.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::error::RubricError;
use crate::model::{ExerciseDefinition, FieldSpec, Value};

/// An authoring defect found while scoring a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricDefect {
    pub field: String,
    pub value: Value,
    pub message: String,
}

/// The scored outcome of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOutcome {
    pub field: String,
    pub score: f64,
    pub max_score: f64,
    pub defect: Option<RubricDefect>,
}

/// Scores of a complete answer set, in declared field order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSheet {
    pub fields: Vec<FieldOutcome>,
}

impl ScoreSheet {
    pub fn total_score(&self) -> f64 {
        self.fields.iter().map(|f| f.score).sum()
    }

    pub fn max_total_score(&self) -> f64 {
        self.fields.iter().map(|f| f.max_score).sum()
    }

    pub fn scores(&self) -> BTreeMap<String, f64> {
        self.fields
            .iter()
            .map(|f| (f.field.clone(), f.score))
            .collect()
    }

    pub fn max_scores(&self) -> BTreeMap<String, f64> {
        self.fields
            .iter()
            .map(|f| (f.field.clone(), f.max_score))
            .collect()
    }

    pub fn defects(&self) -> impl Iterator<Item = &RubricDefect> {
        self.fields.iter().filter_map(|f| f.defect.as_ref())
    }

    pub fn get(&self, field: &str) -> Option<&FieldOutcome> {
        self.fields.iter().find(|f| f.field == field)
    }
}

/// Run the rubric once, turning panics and out-of-contract results into
/// [`RubricError`]s.
pub fn invoke_rubric(
    definition: &ExerciseDefinition,
    field: &FieldSpec,
    value: &Value,
) -> Result<f64, RubricError> {
    let result = catch_unwind(AssertUnwindSafe(|| definition.rubric().score(field, value)))
        .map_err(|payload| RubricError::Panicked(panic_message(payload.as_ref())))??;

    if result.max_score != field.max_score {
        return Err(RubricError::MaxScoreMismatch {
            reported: result.max_score,
            declared: field.max_score,
        });
    }
    if !result.score.is_finite() {
        return Err(RubricError::NonFinite(result.score));
    }
    if result.score < 0.0 || result.score > field.max_score {
        return Err(RubricError::OutOfRange {
            score: result.score,
            max_score: field.max_score,
        });
    }
    Ok(result.score)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Score a single field. `None` means "no answer".
pub fn score_field(
    definition: &ExerciseDefinition,
    field: &FieldSpec,
    value: Option<&Value>,
) -> FieldOutcome {
    let Some(value) = value else {
        return FieldOutcome {
            field: field.id.clone(),
            score: 0.0,
            max_score: field.max_score,
            defect: None,
        };
    };

    match invoke_rubric(definition, field, value) {
        Ok(score) => FieldOutcome {
            field: field.id.clone(),
            score,
            max_score: field.max_score,
            defect: None,
        },
        Err(e) => {
            tracing::warn!(
                exercise = definition.id(),
                field = %field.id,
                %value,
                "rubric defect: {e}"
            );
            FieldOutcome {
                field: field.id.clone(),
                score: 0.0,
                max_score: field.max_score,
                defect: Some(RubricDefect {
                    field: field.id.clone(),
                    value: value.clone(),
                    message: e.to_string(),
                }),
            }
        }
    }
}

/// Score every declared field of `solution`, in declared order.
pub fn score_answer_set(
    definition: &ExerciseDefinition,
    solution: &BTreeMap<String, Option<Value>>,
) -> ScoreSheet {
    let fields = definition
        .fields()
        .iter()
        .map(|field| score_field(definition, field, solution.get(&field.id).and_then(Option::as_ref)))
        .collect();
    ScoreSheet { fields }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerSet, ValueKind};
    use crate::rubric::{Check, FieldScore, KeyedRubric};

    fn scenario() -> ExerciseDefinition {
        ExerciseDefinition::builder("scenario", "Scenario")
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

    fn solution(pairs: &[(&str, Option<i64>)]) -> BTreeMap<String, Option<Value>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(Value::Integer)))
            .collect()
    }

    #[test]
    fn partial_answer_set() {
        let sheet = score_answer_set(&scenario(), &solution(&[("a", Some(1)), ("b", Some(3))]));
        assert_eq!(sheet.scores().get("a"), Some(&1.0));
        assert_eq!(sheet.scores().get("b"), Some(&0.0));
        assert_eq!(sheet.total_score(), 1.0);
        assert_eq!(sheet.max_total_score(), 2.0);
        assert_eq!(sheet.defects().count(), 0);
    }

    #[test]
    fn missing_answer_scores_zero_without_defect() {
        let sheet = score_answer_set(&scenario(), &solution(&[("a", None)]));
        assert_eq!(sheet.get("a").unwrap().score, 0.0);
        assert_eq!(sheet.get("b").unwrap().score, 0.0);
        assert_eq!(sheet.max_total_score(), 2.0);
        assert!(sheet.defects().next().is_none());
    }

    #[test]
    fn rubric_failures_become_defects() {
        let def = ExerciseDefinition::builder("faulty", "Faulty")
            .field(FieldSpec::new("err", ValueKind::Integer))
            .field(FieldSpec::new("panic", ValueKind::Integer))
            .field(FieldSpec::new("range", ValueKind::Integer))
            .field(FieldSpec::new("max", ValueKind::Integer))
            .field(FieldSpec::new("ok", ValueKind::Integer))
            .rubric(|field: &FieldSpec, _: &Value| -> Result<FieldScore, RubricError> {
                match field.id.as_str() {
                    "err" => Err(RubricError::failed("bad state")),
                    "panic" => panic!("rubric exploded"),
                    "range" => Ok(FieldScore::new(5.0, 1.0)),
                    "max" => Ok(FieldScore::new(1.0, 2.0)),
                    _ => Ok(FieldScore::full(field)),
                }
            })
            .the_solution(AnswerSet::new())
            .build()
            .unwrap();

        let answers: BTreeMap<String, Option<Value>> = ["err", "panic", "range", "max", "ok"]
            .iter()
            .map(|f| (f.to_string(), Some(Value::Integer(1))))
            .collect();
        let sheet = score_answer_set(&def, &answers);

        let defects: Vec<_> = sheet.defects().map(|d| d.field.as_str()).collect();
        assert_eq!(defects, vec!["err", "panic", "range", "max"]);
        assert!(sheet.get("panic").unwrap().defect.as_ref().unwrap().message.contains("exploded"));
        assert_eq!(sheet.get("ok").unwrap().score, 1.0);
        assert_eq!(sheet.total_score(), 1.0);
        assert_eq!(sheet.max_total_score(), 5.0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let def = scenario();
        let answers = solution(&[("a", Some(1)), ("b", Some(7))]);
        assert_eq!(score_answer_set(&def, &answers), score_answer_set(&def, &answers));
    }
}
