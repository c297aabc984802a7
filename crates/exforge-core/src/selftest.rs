//! Self-tests derived from an exercise's reference inputs.
//!
//! Every (field, reference input) pair becomes one independent case that
//! scores the reference value through the rubric without any frontend.
//! A rubric error or panic fails the case; it never aborts the suite.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DefinitionError;
use crate::model::{ExerciseDefinition, ExercisePool, FieldSpec, TrivialExpectation, Value};
use crate::scoring::invoke_rubric;

/// Which reference input a case feeds to the rubric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfTestKind {
    Trivial,
    Dummy,
    TheSolution,
    ASolution,
}

impl SelfTestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelfTestKind::Trivial => "trivial",
            SelfTestKind::Dummy => "dummy",
            SelfTestKind::TheSolution => "the_solution",
            SelfTestKind::ASolution => "a_solution",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            SelfTestKind::Trivial => "trivial input",
            SelfTestKind::Dummy => "dummy input",
            SelfTestKind::TheSolution => "the solution",
            SelfTestKind::ASolution => "a solution",
        }
    }
}

impl fmt::Display for SelfTestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One runnable self-test.
#[derive(Debug, Clone)]
pub struct SelfTestCase {
    name: String,
    definition: Arc<ExerciseDefinition>,
    field: FieldSpec,
    kind: SelfTestKind,
    input: Value,
    /// The canonical solution's value, for dummy cases.
    baseline: Option<Value>,
}

/// Result of running one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfTestOutcome {
    pub name: String,
    pub passed: bool,
    pub diagnostic: String,
}

impl SelfTestCase {
    /// `<exercise>::<field>::<kind>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SelfTestKind {
        self.kind
    }

    pub fn field(&self) -> &FieldSpec {
        &self.field
    }

    pub fn input(&self) -> &Value {
        &self.input
    }

    pub fn run(&self) -> SelfTestOutcome {
        let field = &self.field;
        let used = format!("field '{}' with {} {}", field.id, self.kind.describe(), self.input);

        let score = match invoke_rubric(&self.definition, field, &self.input) {
            Ok(score) => score,
            Err(e) => return self.outcome(false, format!("{used}: {e}")),
        };

        match self.kind {
            SelfTestKind::TheSolution | SelfTestKind::ASolution => {
                let passed = score >= field.max_score;
                self.outcome(
                    passed,
                    format!("{used}: expected {}, got {score}", field.max_score),
                )
            }
            SelfTestKind::Trivial => {
                let expectation = field.trivial_expectation;
                self.outcome(
                    expectation.is_met(score, field.max_score),
                    format!("{used}: expected {expectation}, got {score}"),
                )
            }
            SelfTestKind::Dummy => {
                let Some(baseline) = &self.baseline else {
                    return self.outcome(false, format!("{used}: no canonical value to compare"));
                };
                match invoke_rubric(&self.definition, field, baseline) {
                    Ok(solution_score) => self.outcome(
                        score < solution_score,
                        format!(
                            "{used}: expected less than {solution_score} (the solution {baseline}), got {score}"
                        ),
                    ),
                    Err(e) => self.outcome(false, format!("{used}: the solution {baseline}: {e}")),
                }
            }
        }
    }

    fn outcome(&self, passed: bool, diagnostic: String) -> SelfTestOutcome {
        SelfTestOutcome {
            name: self.name.clone(),
            passed,
            diagnostic,
        }
    }
}

/// Derive the self-tests of one exercise.
///
/// Fails when the reference inputs themselves are broken (missing or
/// ill-typed values); rubric misbehaviour surfaces when the cases run.
pub fn generate_self_tests(
    definition: &Arc<ExerciseDefinition>,
    seed: u64,
) -> Result<Vec<SelfTestCase>, DefinitionError> {
    let snapshot = definition.snapshot(seed);
    definition.check_references(&snapshot)?;

    let mut cases = Vec::new();
    for field in definition.fields() {
        let value_of = |kind: SelfTestKind| {
            let set = match kind {
                SelfTestKind::Trivial => &snapshot.trivial_input,
                SelfTestKind::Dummy => &snapshot.dummy_input,
                SelfTestKind::TheSolution => &snapshot.the_solution,
                SelfTestKind::ASolution => &snapshot.a_solution,
            };
            set.get(&field.id).cloned()
        };

        let mut kinds = Vec::with_capacity(4);
        if field.trivial_expectation != TrivialExpectation::Unchecked {
            kinds.push(SelfTestKind::Trivial);
        }
        if !field.rubric_agnostic {
            kinds.push(SelfTestKind::Dummy);
        }
        kinds.push(SelfTestKind::TheSolution);
        kinds.push(SelfTestKind::ASolution);

        for kind in kinds {
            let Some(input) = value_of(kind) else {
                continue;
            };
            cases.push(SelfTestCase {
                name: format!("{}::{}::{}", definition.id(), field.id, kind),
                definition: Arc::clone(definition),
                field: field.clone(),
                kind,
                input,
                baseline: if kind == SelfTestKind::Dummy {
                    value_of(SelfTestKind::TheSolution)
                } else {
                    None
                },
            });
        }
    }
    Ok(cases)
}

#[derive(Debug, Clone)]
enum SuiteEntry {
    Case(SelfTestCase),
    /// An exercise whose cases could not be generated.
    Broken { name: String, diagnostic: String },
}

/// Self-tests aggregated across a pool.
#[derive(Debug, Clone, Default)]
pub struct SelfTestSuite {
    entries: Vec<SuiteEntry>,
}

impl SelfTestSuite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the cases of every exercise in `pool`.
    pub fn for_pool(pool: &ExercisePool, seed: u64) -> Self {
        let mut suite = Self::new();
        for definition in pool {
            suite.add(definition, seed);
        }
        suite
    }

    pub fn add(&mut self, definition: &Arc<ExerciseDefinition>, seed: u64) {
        match generate_self_tests(definition, seed) {
            Ok(cases) => self.entries.extend(cases.into_iter().map(SuiteEntry::Case)),
            Err(e) => {
                tracing::warn!(exercise = definition.id(), "cannot generate self-tests: {e}");
                self.entries.push(SuiteEntry::Broken {
                    name: format!("{}::definition", definition.id()),
                    diagnostic: e.to_string(),
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn run(&self) -> SelfTestReport {
        let outcomes = self
            .entries
            .iter()
            .map(|entry| match entry {
                SuiteEntry::Case(case) => {
                    let outcome = case.run();
                    tracing::debug!(case = %outcome.name, passed = outcome.passed, "self-test");
                    outcome
                }
                SuiteEntry::Broken { name, diagnostic } => SelfTestOutcome {
                    name: name.clone(),
                    passed: false,
                    diagnostic: diagnostic.clone(),
                },
            })
            .collect();
        SelfTestReport { outcomes }
    }

    /// Run the suite and panic with every failure listed.
    pub fn assert_passing(&self) {
        let report = self.run();
        if !report.all_passed() {
            let lines: Vec<String> = report
                .failures()
                .map(|o| format!("  {}: {}", o.name, o.diagnostic))
                .collect();
            panic!(
                "{} of {} self-tests failed:\n{}",
                report.failed(),
                report.outcomes.len(),
                lines.join("\n")
            );
        }
    }
}

/// Outcomes of one suite run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfTestReport {
    pub outcomes: Vec<SelfTestOutcome>,
}

impl SelfTestReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &SelfTestOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }
}
