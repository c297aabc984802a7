//! Static checks over exercise definitions and pools.

use std::collections::HashSet;
use std::fmt;

use crate::model::{ExerciseDefinition, ExercisePool};
use crate::scoring::invoke_rubric;

/// A warning from definition or answer-sheet validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    /// The exercise ID (if applicable).
    pub exercise: Option<String>,
    /// The field ID (if applicable).
    pub field: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    pub fn exercise(exercise: &str, message: impl Into<String>) -> Self {
        Self {
            exercise: Some(exercise.to_string()),
            field: None,
            message: message.into(),
        }
    }

    pub fn field(exercise: &str, field: &str, message: impl Into<String>) -> Self {
        Self {
            exercise: Some(exercise.to_string()),
            field: Some(field.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.exercise, &self.field) {
            (Some(e), Some(field)) => write!(f, "[{e}.{field}] {}", self.message),
            (Some(e), None) => write!(f, "[{e}] {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Validate one definition for common authoring issues.
pub fn validate_definition(definition: &ExerciseDefinition, seed: u64) -> Vec<ValidationWarning> {
    let id = definition.id();
    let mut warnings = Vec::new();

    if let Err(e) = definition.check(seed) {
        warnings.push(ValidationWarning::exercise(id, e.to_string()));
    }

    if definition.title().trim().is_empty() {
        warnings.push(ValidationWarning::exercise(id, "title is empty"));
    }

    for field in definition.fields() {
        if field.label.trim().is_empty() {
            warnings.push(ValidationWarning::field(id, &field.id, "label is empty"));
        }
        if field.max_score == 0.0 {
            warnings.push(ValidationWarning::field(
                id,
                &field.id,
                "field has zero weight and never contributes to the total",
            ));
        }
    }

    // Same seed, same references.
    if definition.snapshot(seed) != definition.snapshot(seed) {
        warnings.push(ValidationWarning::exercise(
            id,
            "reference generators are not reproducible for a fixed seed",
        ));
    }

    let snapshot = definition.snapshot(seed);
    for field in definition.fields() {
        let Some(value) = snapshot.the_solution.get(&field.id) else {
            continue;
        };
        let first = invoke_rubric(definition, field, value);
        let second = invoke_rubric(definition, field, value);
        if let (Ok(a), Ok(b)) = (&first, &second) {
            if a != b {
                warnings.push(ValidationWarning::field(
                    id,
                    &field.id,
                    format!("rubric is not deterministic: scored {value} as {a} then {b}"),
                ));
            }
        }
    }

    warnings
}

/// Validate every definition of a pool, plus pool-level issues.
pub fn validate_pool(pool: &ExercisePool, seed: u64) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen_ids = HashSet::new();
    for definition in pool {
        if !seen_ids.insert(definition.id()) {
            warnings.push(ValidationWarning::exercise(
                definition.id(),
                format!("duplicate exercise ID: {}", definition.id()),
            ));
        }
    }

    for definition in pool {
        warnings.extend(validate_definition(definition, seed));
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::error::RubricError;
    use crate::model::{AnswerSet, FieldSpec, Value, ValueKind};
    use crate::rubric::{Check, FieldScore, KeyedRubric};

    fn simple(id: &str) -> ExerciseDefinition {
        ExerciseDefinition::builder(id, "Simple")
            .field(FieldSpec::new("n", ValueKind::Integer))
            .rubric(KeyedRubric::new().check("n", Check::Equals(3.into())))
            .the_solution(AnswerSet::new().with("n", 3))
            .build()
            .unwrap()
    }

    #[test]
    fn clean_definition_has_no_warnings() {
        assert!(validate_definition(&simple("ok"), 1).is_empty());
    }

    #[test]
    fn duplicate_ids_in_pool() {
        let pool: ExercisePool = [simple("same"), simple("same")].into_iter().collect();
        let warnings = validate_pool(&pool, 1);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("duplicate exercise ID"));
    }

    #[test]
    fn zero_weight_and_empty_label() {
        let def = ExerciseDefinition::builder("light", "Light")
            .field(
                FieldSpec::new("n", ValueKind::Integer)
                    .with_label("")
                    .with_max_score(0.0),
            )
            .rubric(|f: &FieldSpec, _: &Value| -> Result<FieldScore, RubricError> {
                Ok(FieldScore::zero(f))
            })
            .the_solution(AnswerSet::new().with("n", 1))
            .build()
            .unwrap();
        let warnings = validate_definition(&def, 0);
        let messages: Vec<_> = warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.contains(&"label is empty"));
        assert!(messages.iter().any(|m| m.contains("zero weight")));
    }

    #[test]
    fn failed_check_is_reported() {
        let def = ExerciseDefinition::builder("bad", "Bad")
            .field(FieldSpec::new("n", ValueKind::Integer))
            .rubric(KeyedRubric::new().check("n", Check::Equals(3.into())))
            .the_solution(AnswerSet::new().with("n", true))
            .build()
            .unwrap();
        let warnings = validate_definition(&def, 0);
        assert!(warnings[0].to_string().starts_with("[bad] the solution value true"));
    }

    #[test]
    fn flaky_rubric_is_flagged() {
        let calls = AtomicU32::new(0);
        let def = ExerciseDefinition::builder("flaky", "Flaky")
            .field(FieldSpec::new("n", ValueKind::Integer).with_max_score(2.0))
            .rubric(move |f: &FieldSpec, _: &Value| -> Result<FieldScore, RubricError> {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Ok(FieldScore::new((n % 2) as f64 + 1.0, f.max_score))
            })
            .the_solution(AnswerSet::new().with("n", 1))
            .build()
            .unwrap();
        let warnings = validate_definition(&def, 0);
        assert!(warnings
            .iter()
            .any(|w| w.field.as_deref() == Some("n") && w.message.contains("not deterministic")));
    }
}
