//! Built-in exercises.
//!
//! Used by the CLI when no other pool is supplied, and as living examples of
//! how to declare fields, rubrics and reference inputs.

use rand::Rng;

use crate::error::{DefinitionError, RubricError};
use crate::model::{
    AnswerSet, ExerciseDefinition, ExercisePool, FieldSpec, ReferenceInput, TrivialExpectation,
    Value, ValueKind,
};
use crate::rubric::{Check, FieldScore, KeyedRubric};

/// Every built-in exercise, in presentation order.
pub fn builtin_pool() -> Result<ExercisePool, DefinitionError> {
    let mut pool = ExercisePool::new();
    pool.push(addition()?);
    pool.push(coordinates()?);
    pool.push(capital()?);
    pool.push(multiple_of_seven()?);
    pool.push(square_root()?);
    pool.push(prime()?);
    pool.push(planet()?);
    Ok(pool)
}

fn addition() -> Result<ExerciseDefinition, DefinitionError> {
    ExerciseDefinition::builder("addition", "Integer addition")
        .preamble("What is 2 + 3?")
        .tag("arithmetic")
        .field(
            FieldSpec::new("sum", ValueKind::Integer)
                .with_label("2 + 3 =")
                .expect_trivial(TrivialExpectation::Exactly(0.0)),
        )
        .rubric(KeyedRubric::new().check("sum", Check::Equals(5.into())))
        .the_solution(AnswerSet::new().with("sum", 5))
        .build()
}

fn coordinates() -> Result<ExerciseDefinition, DefinitionError> {
    ExerciseDefinition::builder("coordinates", "Point on a line")
        .preamble("The line y = x + 1 passes through a point with x = 1. Give both coordinates.")
        .tag("arithmetic")
        .field(
            FieldSpec::new("a", ValueKind::Integer)
                .with_label("x")
                .expect_trivial(TrivialExpectation::Exactly(0.0)),
        )
        .field(
            FieldSpec::new("b", ValueKind::Integer)
                .with_label("y")
                .expect_trivial(TrivialExpectation::Exactly(0.0)),
        )
        .rubric(
            KeyedRubric::new()
                .check("a", Check::Equals(1.into()))
                .check("b", Check::Equals(2.into())),
        )
        .the_solution(AnswerSet::new().with("a", 1).with("b", 2))
        .build()
}

fn capital() -> Result<ExerciseDefinition, DefinitionError> {
    ExerciseDefinition::builder("capital", "Capital city")
        .preamble("What is the capital of Ukraine?")
        .tag("geography")
        .field(
            FieldSpec::new("city", ValueKind::Text)
                .with_label("Capital")
                .expect_trivial(TrivialExpectation::Exactly(0.0)),
        )
        .rubric(
            |field: &FieldSpec, value: &Value| -> Result<FieldScore, RubricError> {
                let city = value
                    .as_text()
                    .ok_or_else(|| RubricError::failed("city must be text"))?
                    .trim()
                    .to_lowercase();
                Ok(FieldScore::pass_fail(field, matches!(city.as_str(), "kyiv" | "kiev")))
            },
        )
        .the_solution(AnswerSet::new().with("city", "Kyiv"))
        .a_solution(AnswerSet::new().with("city", "kiev"))
        .build()
}

fn multiple_of_seven() -> Result<ExerciseDefinition, DefinitionError> {
    ExerciseDefinition::builder("multiple-of-seven", "A multiple of seven")
        .preamble("Enter any positive multiple of 7.")
        .tag("arithmetic")
        .tag("seeded")
        .field(
            FieldSpec::new("n", ValueKind::Integer)
                .with_label("n")
                .expect_trivial(TrivialExpectation::Exactly(0.0)),
        )
        .rubric(
            |field: &FieldSpec, value: &Value| -> Result<FieldScore, RubricError> {
                let Value::Integer(n) = value else {
                    return Err(RubricError::failed("n must be an integer"));
                };
                Ok(FieldScore::pass_fail(field, *n > 0 && n % 7 == 0))
            },
        )
        .the_solution(ReferenceInput::generated(|rng| {
            AnswerSet::new().with("n", rng.gen_range(1..=100i64) * 7)
        }))
        .a_solution(ReferenceInput::generated(|rng| {
            AnswerSet::new().with("n", rng.gen_range(101..=1000i64) * 7)
        }))
        .dummy_input(ReferenceInput::generated(|rng| {
            AnswerSet::new().with("n", rng.gen_range(0..100i64) * 7 + rng.gen_range(1..7i64))
        }))
        .build()
}

fn square_root() -> Result<ExerciseDefinition, DefinitionError> {
    ExerciseDefinition::builder("square-root", "Square root of two")
        .preamble("Give the square root of 2 to at least two decimal places.")
        .tag("approximation")
        .field(
            FieldSpec::new("root", ValueKind::Float)
                .with_label("sqrt(2) ~")
                .expect_trivial(TrivialExpectation::Exactly(0.0)),
        )
        .rubric(KeyedRubric::new().check(
            "root",
            Check::Within {
                target: std::f64::consts::SQRT_2,
                tolerance: 0.005,
            },
        ))
        .the_solution(AnswerSet::new().with("root", 1.41))
        .a_solution(AnswerSet::new().with("root", 1.4142))
        .build()
}

fn prime() -> Result<ExerciseDefinition, DefinitionError> {
    ExerciseDefinition::builder("prime", "Is it prime?")
        .preamble("Is 17 a prime number?")
        .tag("number-theory")
        .field(
            FieldSpec::new("is_prime", ValueKind::Boolean)
                .with_label("17 is prime (yes/no)")
                .expect_trivial(TrivialExpectation::Exactly(0.0)),
        )
        .rubric(KeyedRubric::new().check("is_prime", Check::Equals(true.into())))
        .the_solution(AnswerSet::new().with("is_prime", true))
        .build()
}

fn planet() -> Result<ExerciseDefinition, DefinitionError> {
    ExerciseDefinition::builder("planet", "Closest planet")
        .preamble("Which planet orbits closest to the Sun?")
        .tag("astronomy")
        .field(
            FieldSpec::new(
                "planet",
                ValueKind::choice(["Mercury", "Venus", "Earth", "Mars"]),
            )
            .with_label("Planet")
            .with_max_score(2.0),
        )
        .rubric(KeyedRubric::new().check("planet", Check::Equals("Mercury".into())))
        .the_solution(AnswerSet::new().with("planet", "Mercury"))
        .build()
}
