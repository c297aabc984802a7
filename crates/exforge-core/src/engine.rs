//! The attempt engine.
//!
//! Drives one exercise attempt against one frontend:
//!
//! ```text
//! INIT -> PRESENT -> AWAIT_ANSWER -> VALIDATE -> (RETRY | RECORD) -> [next field | SCORE] -> DONE
//! ```
//!
//! The engine is strictly sequential. The only suspension point is the
//! frontend's `collect` call, which is raced against an optional
//! cancellation signal.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};

use crate::error::{AttemptError, DefinitionError, FrontendError, InputError};
use crate::model::{ExerciseDefinition, ExercisePool, Value};
use crate::results::{AttemptStatus, ExerciseRecord, InputNote, NoAnswerReason};
use crate::scoring::score_answer_set;
use crate::traits::{Collected, FieldPrompt, Frontend};

/// Configuration for the attempt engine.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Malformed inputs accepted for one field before it is recorded as
    /// "no answer". Values below 1 are treated as 1.
    pub retry_cap: u32,
    /// Seed for the reference-input generators; drawn at random when unset.
    pub seed: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            retry_cap: 3,
            seed: None,
        }
    }
}

/// Triggers cancellation of the attempts holding the paired [`CancelSignal`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by the engine while it waits for an answer.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if every
    /// handle is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Create a connected cancellation handle and signal.
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelSignal { rx })
}

/// Observable position of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Present,
    AwaitAnswer,
    Validate,
    Retry,
    Record,
    Score,
    Done,
}

/// How a field was settled.
#[derive(Debug)]
enum Resolution {
    Answer(Value),
    NoAnswer(NoAnswerReason),
}

#[derive(Debug)]
enum AttemptState {
    Present {
        index: usize,
        attempt: u32,
        error: Option<String>,
    },
    AwaitAnswer {
        index: usize,
        attempt: u32,
    },
    Validate {
        index: usize,
        attempt: u32,
        collected: Collected,
    },
    Retry {
        index: usize,
        attempt: u32,
        raw: Option<String>,
        error: InputError,
    },
    Record {
        index: usize,
        resolution: Resolution,
    },
    Score,
    Done,
}

impl AttemptState {
    fn phase(&self) -> Phase {
        match self {
            AttemptState::Present { .. } => Phase::Present,
            AttemptState::AwaitAnswer { .. } => Phase::AwaitAnswer,
            AttemptState::Validate { .. } => Phase::Validate,
            AttemptState::Retry { .. } => Phase::Retry,
            AttemptState::Record { .. } => Phase::Record,
            AttemptState::Score => Phase::Score,
            AttemptState::Done => Phase::Done,
        }
    }
}

/// Runs one attempt of one exercise against one frontend.
pub struct AttemptRunner<F: Frontend> {
    definition: Arc<ExerciseDefinition>,
    frontend: F,
    config: RunnerConfig,
    cancel: CancelSignal,
    record: ExerciseRecord,
    phase: Phase,
}

impl<F: Frontend> AttemptRunner<F> {
    /// INIT: capture the reference snapshots, check their shape, and create
    /// the record.
    pub fn new(
        definition: impl Into<Arc<ExerciseDefinition>>,
        frontend: F,
        config: RunnerConfig,
    ) -> Result<Self, DefinitionError> {
        let definition = definition.into();
        let seed = config.seed.unwrap_or_else(rand::random);
        let snapshot = definition.prepare(seed)?;
        let record = ExerciseRecord::start(&definition, seed, snapshot);
        debug!(exercise = definition.id(), seed, "attempt initialised");

        Ok(Self {
            definition,
            frontend,
            config,
            cancel: CancelSignal::never(),
            record,
            phase: Phase::Init,
        })
    }

    pub fn with_cancel(mut self, signal: CancelSignal) -> Self {
        self.cancel = signal;
        self
    }

    pub fn definition(&self) -> &ExerciseDefinition {
        &self.definition
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn record(&self) -> &ExerciseRecord {
        &self.record
    }

    pub fn into_record(self) -> ExerciseRecord {
        self.record
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn into_parts(self) -> (F, ExerciseRecord) {
        (self.frontend, self.record)
    }

    /// Drive the attempt to a terminal state.
    ///
    /// Returns `Completed` or `Cancelled`; a frontend failure aborts the
    /// attempt and is returned as an error. Calling `run` on a finished
    /// attempt returns its status without doing anything.
    pub async fn run(&mut self) -> Result<AttemptStatus, AttemptError> {
        if self.record.status().is_finished() {
            return Ok(self.record.status().clone());
        }

        let definition = Arc::clone(&self.definition);
        let fields = definition.fields();
        let retry_cap = self.config.retry_cap.max(1);

        info!(
            exercise = definition.id(),
            attempt = %self.record.id(),
            frontend = self.frontend.name(),
            "attempt started"
        );

        let mut state = AttemptState::Present {
            index: 0,
            attempt: 1,
            error: None,
        };

        loop {
            self.phase = state.phase();
            debug!(exercise = definition.id(), state = ?self.phase, "transition");

            state = match state {
                AttemptState::Present {
                    index,
                    attempt,
                    error,
                } => {
                    let field = &fields[index];
                    let prompt = FieldPrompt {
                        exercise_id: definition.id(),
                        title: definition.title(),
                        preamble: definition.preamble(),
                        field,
                        index,
                        total: fields.len(),
                        attempt,
                        error,
                    };
                    if let Err(source) = self.frontend.render(&prompt).await {
                        return Err(self.fail(Some(&field.id), source));
                    }
                    AttemptState::AwaitAnswer { index, attempt }
                }

                AttemptState::AwaitAnswer { index, attempt } => {
                    let field = &fields[index];
                    let cancel = &mut self.cancel;
                    let frontend = &mut self.frontend;
                    let waited = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        collected = frontend.collect(field) => Some(collected),
                    };

                    match waited {
                        None => {
                            info!(exercise = definition.id(), field = %field.id, "attempt cancelled");
                            self.record.abort(AttemptStatus::Cancelled);
                            self.phase = Phase::Done;
                            return Ok(AttemptStatus::Cancelled);
                        }
                        Some(Err(source)) => return Err(self.fail(Some(&field.id), source)),
                        Some(Ok(collected)) => AttemptState::Validate {
                            index,
                            attempt,
                            collected,
                        },
                    }
                }

                AttemptState::Validate {
                    index,
                    attempt,
                    collected,
                } => {
                    let field = &fields[index];
                    match collected {
                        Collected::Raw(raw) => match field.kind.parse(&raw) {
                            Ok(value) => AttemptState::Record {
                                index,
                                resolution: Resolution::Answer(value),
                            },
                            Err(error) => AttemptState::Retry {
                                index,
                                attempt,
                                raw: Some(raw),
                                error,
                            },
                        },
                        Collected::Skip => AttemptState::Record {
                            index,
                            resolution: Resolution::NoAnswer(NoAnswerReason::Skipped),
                        },
                        Collected::TimedOut => AttemptState::Retry {
                            index,
                            attempt,
                            raw: None,
                            error: InputError::TimedOut,
                        },
                    }
                }

                AttemptState::Retry {
                    index,
                    attempt,
                    raw,
                    error,
                } => {
                    let field = &fields[index];
                    debug!(field = %field.id, attempt, "malformed input: {error}");
                    self.record.note_input_error(InputNote {
                        field: field.id.clone(),
                        raw,
                        message: error.to_string(),
                    });

                    if attempt >= retry_cap {
                        warn!(
                            exercise = definition.id(),
                            field = %field.id,
                            attempts = attempt,
                            "retry cap reached, recording no answer"
                        );
                        AttemptState::Record {
                            index,
                            resolution: Resolution::NoAnswer(NoAnswerReason::RetryCapExceeded {
                                attempts: attempt,
                            }),
                        }
                    } else {
                        AttemptState::Present {
                            index,
                            attempt: attempt + 1,
                            error: Some(error.to_string()),
                        }
                    }
                }

                AttemptState::Record { index, resolution } => {
                    let field = &fields[index];
                    match resolution {
                        Resolution::Answer(value) => {
                            debug!(field = %field.id, %value, "answer recorded");
                            self.record.record_answer(&field.id, value);
                        }
                        Resolution::NoAnswer(reason) => {
                            debug!(field = %field.id, ?reason, "no answer recorded");
                            self.record.record_no_answer(&field.id, reason);
                        }
                    }

                    if index + 1 < fields.len() {
                        AttemptState::Present {
                            index: index + 1,
                            attempt: 1,
                            error: None,
                        }
                    } else {
                        AttemptState::Score
                    }
                }

                AttemptState::Score => {
                    let solution = self.record.finalized_solution();
                    let sheet = score_answer_set(&definition, &solution);
                    self.record.seal(solution, &sheet);
                    info!(
                        exercise = definition.id(),
                        total = sheet.total_score(),
                        max = sheet.max_total_score(),
                        defects = sheet.defects().count(),
                        "attempt scored"
                    );
                    AttemptState::Done
                }

                AttemptState::Done => {
                    if let Err(source) = self.frontend.report(&self.record).await {
                        error!(exercise = definition.id(), "failed to report result: {source}");
                        return Err(AttemptError::Frontend {
                            field: None,
                            source,
                        });
                    }
                    return Ok(AttemptStatus::Completed);
                }
            };
        }
    }

    fn fail(&mut self, field: Option<&str>, source: FrontendError) -> AttemptError {
        error!(
            exercise = self.definition.id(),
            field = field.unwrap_or("-"),
            "frontend failed: {source}"
        );
        self.record.abort(AttemptStatus::Failed {
            error: source.to_string(),
        });
        self.phase = Phase::Done;
        AttemptError::Frontend {
            field: field.map(str::to_string),
            source,
        }
    }
}

/// The result of one attempt in a batch.
#[derive(Debug)]
pub struct BatchEntry {
    pub exercise_id: String,
    /// Absent when the definition was refused at INIT.
    pub record: Option<ExerciseRecord>,
    pub outcome: Result<AttemptStatus, AttemptError>,
}

/// Run one independent attempt per exercise of `pool`, at most
/// `parallelism` at a time. Entries come back in pool order.
pub async fn run_batch<F, M>(
    pool: &ExercisePool,
    mut make_frontend: M,
    config: &RunnerConfig,
    parallelism: usize,
) -> Vec<BatchEntry>
where
    F: Frontend,
    M: FnMut(&ExerciseDefinition) -> F,
{
    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let mut futures = FuturesUnordered::new();

    for (position, definition) in pool.iter().enumerate() {
        let frontend = make_frontend(definition);
        let definition = Arc::clone(definition);
        let semaphore = Arc::clone(&semaphore);
        let config = config.clone();

        futures.push(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let exercise_id = definition.id().to_string();

            let entry = match AttemptRunner::new(definition, frontend, config) {
                Ok(mut runner) => {
                    let outcome = runner.run().await;
                    BatchEntry {
                        exercise_id,
                        record: Some(runner.into_record()),
                        outcome,
                    }
                }
                Err(e) => {
                    warn!(exercise = %exercise_id, "skipping invalid exercise: {e}");
                    BatchEntry {
                        exercise_id,
                        record: None,
                        outcome: Err(e.into()),
                    }
                }
            };
            (position, entry)
        });
    }

    let mut entries = Vec::with_capacity(futures.len());
    while let Some(item) = futures.next().await {
        entries.push(item);
    }
    entries.sort_by_key(|(position, _)| *position);
    entries.into_iter().map(|(_, entry)| entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::RubricError;
    use crate::model::{AnswerSet, FieldSpec, ValueKind};
    use crate::report::format_summary;
    use crate::rubric::{Check, FieldScore, KeyedRubric};

    enum Step {
        Answer(Collected),
        Fail,
        Hang,
    }

    /// Frontend fed from a queue; shares what it saw with the test.
    struct QueueFrontend {
        steps: VecDeque<Step>,
        seen: Arc<Mutex<Seen>>,
    }

    #[derive(Default)]
    struct Seen {
        prompts: Vec<(String, u32, Option<String>)>,
        reports: usize,
    }

    impl QueueFrontend {
        fn new(steps: Vec<Step>) -> (Self, Arc<Mutex<Seen>>) {
            let seen = Arc::new(Mutex::new(Seen::default()));
            (
                Self {
                    steps: steps.into(),
                    seen: Arc::clone(&seen),
                },
                seen,
            )
        }

        fn raw(inputs: &[&str]) -> Vec<Step> {
            inputs
                .iter()
                .map(|s| Step::Answer(Collected::Raw(s.to_string())))
                .collect()
        }
    }

    #[async_trait]
    impl Frontend for QueueFrontend {
        fn name(&self) -> &str {
            "queue"
        }

        async fn render(&mut self, prompt: &FieldPrompt<'_>) -> Result<(), FrontendError> {
            self.seen.lock().unwrap().prompts.push((
                prompt.field.id.clone(),
                prompt.attempt,
                prompt.error.clone(),
            ));
            Ok(())
        }

        async fn collect(&mut self, field: &FieldSpec) -> Result<Collected, FrontendError> {
            match self.steps.pop_front() {
                Some(Step::Answer(c)) => Ok(c),
                Some(Step::Fail) => Err(FrontendError::Other("pipe broke".into())),
                Some(Step::Hang) => std::future::pending().await,
                None => Err(FrontendError::Closed(field.id.clone())),
            }
        }

        async fn report(&mut self, _: &ExerciseRecord) -> Result<(), FrontendError> {
            self.seen.lock().unwrap().reports += 1;
            Ok(())
        }
    }

    fn scenario() -> ExerciseDefinition {
        ExerciseDefinition::builder("scenario", "Two fields")
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

    fn config() -> RunnerConfig {
        RunnerConfig {
            retry_cap: 3,
            seed: Some(11),
        }
    }

    #[tokio::test]
    async fn scores_submitted_answers() {
        let (frontend, seen) = QueueFrontend::new(QueueFrontend::raw(&["1", "3"]));
        let mut runner = AttemptRunner::new(scenario(), frontend, config()).unwrap();
        assert_eq!(runner.phase(), Phase::Init);

        let status = runner.run().await.unwrap();
        assert_eq!(status, AttemptStatus::Completed);
        assert_eq!(runner.phase(), Phase::Done);

        let record = runner.record();
        assert_eq!(record.scores().get("a"), Some(&1.0));
        assert_eq!(record.scores().get("b"), Some(&0.0));
        assert_eq!(record.total_score(), 1.0);
        assert_eq!(record.max_total_score(), 2.0);
        assert_eq!(record.seed(), 11);
        assert_eq!(seen.lock().unwrap().reports, 1);
    }

    #[tokio::test]
    async fn fields_are_presented_in_declared_order() {
        let (frontend, seen) = QueueFrontend::new(QueueFrontend::raw(&["1", "2"]));
        let mut runner = AttemptRunner::new(scenario(), frontend, config()).unwrap();
        runner.run().await.unwrap();

        let order: Vec<_> = seen
            .lock()
            .unwrap()
            .prompts
            .iter()
            .map(|(f, _, _)| f.clone())
            .collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_eq!(runner.record().total_score(), 2.0);
    }

    #[tokio::test]
    async fn malformed_input_is_re_asked_with_annotation() {
        let (frontend, seen) = QueueFrontend::new(QueueFrontend::raw(&["one", "1", "2"]));
        let mut runner = AttemptRunner::new(scenario(), frontend, config()).unwrap();
        runner.run().await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.prompts.len(), 3);
        assert_eq!(seen.prompts[1].0, "a");
        assert_eq!(seen.prompts[1].1, 2);
        assert_eq!(
            seen.prompts[1].2.as_deref(),
            Some("'one' is not a whole number")
        );
        assert_eq!(runner.record().input_errors().len(), 1);
        assert_eq!(runner.record().total_score(), 2.0);
    }

    #[tokio::test]
    async fn retry_cap_records_no_answer_and_moves_on() {
        let (frontend, _) = QueueFrontend::new(QueueFrontend::raw(&["x", "y", "z", "2"]));
        let mut runner = AttemptRunner::new(scenario(), frontend, config()).unwrap();
        let status = runner.run().await.unwrap();

        assert_eq!(status, AttemptStatus::Completed);
        let record = runner.record();
        assert_eq!(
            record.no_answers().get("a"),
            Some(&NoAnswerReason::RetryCapExceeded { attempts: 3 })
        );
        assert!(!record.answers().contains_key("a"));
        assert_eq!(record.scores().get("a"), Some(&0.0));
        assert_eq!(record.scores().get("b"), Some(&1.0));
        assert_eq!(record.solution().unwrap().get("a"), Some(&None));
    }

    #[tokio::test]
    async fn timeouts_count_as_malformed() {
        let steps = vec![
            Step::Answer(Collected::TimedOut),
            Step::Answer(Collected::Raw("1".into())),
            Step::Answer(Collected::Skip),
        ];
        let (frontend, _) = QueueFrontend::new(steps);
        let mut runner = AttemptRunner::new(scenario(), frontend, config()).unwrap();
        runner.run().await.unwrap();

        let record = runner.record();
        assert_eq!(record.input_errors()[0].raw, None);
        assert_eq!(record.no_answers().get("b"), Some(&NoAnswerReason::Skipped));
        assert_eq!(record.total_score(), 1.0);
    }

    #[tokio::test]
    async fn frontend_failure_aborts_unsealed() {
        let steps = vec![Step::Answer(Collected::Raw("1".into())), Step::Fail];
        let (frontend, seen) = QueueFrontend::new(steps);
        let mut runner = AttemptRunner::new(scenario(), frontend, config()).unwrap();

        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, AttemptError::Frontend { field: Some(ref f), .. } if f == "b"));
        let record = runner.record();
        assert!(matches!(record.status(), AttemptStatus::Failed { .. }));
        assert!(!record.is_sealed());
        assert!(record.scores().is_empty());
        assert_eq!(seen.lock().unwrap().reports, 0);
    }

    #[tokio::test]
    async fn cancellation_keeps_last_recorded_state() {
        let steps = vec![Step::Answer(Collected::Raw("1".into())), Step::Hang];
        let (frontend, seen) = QueueFrontend::new(steps);
        let (handle, signal) = cancellation();
        let mut runner = AttemptRunner::new(scenario(), frontend, config())
            .unwrap()
            .with_cancel(signal);

        let cancel = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            handle.cancel();
        });
        let status = runner.run().await.unwrap();
        cancel.await.unwrap();

        assert_eq!(status, AttemptStatus::Cancelled);
        let record = runner.record();
        assert_eq!(record.status(), &AttemptStatus::Cancelled);
        assert_eq!(record.answers().len(), 1);
        assert!(!record.answers().contains_key("b"));
        assert!(record.solution().is_none());
        assert_eq!(seen.lock().unwrap().reports, 0);
    }

    #[tokio::test]
    async fn shared_signal_cancelled_between_attempts_stops_the_next() {
        let (handle, signal) = cancellation();

        let (frontend, _) = QueueFrontend::new(QueueFrontend::raw(&["1", "2"]));
        let mut first = AttemptRunner::new(scenario(), frontend, config())
            .unwrap()
            .with_cancel(signal.clone());
        assert_eq!(first.run().await.unwrap(), AttemptStatus::Completed);

        // Raised while nothing is waiting for input.
        handle.cancel();
        assert!(signal.is_cancelled());

        let (frontend, seen) = QueueFrontend::new(QueueFrontend::raw(&["1", "2"]));
        let mut second = AttemptRunner::new(scenario(), frontend, config())
            .unwrap()
            .with_cancel(signal);
        assert_eq!(second.run().await.unwrap(), AttemptStatus::Cancelled);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.prompts.len(), 1);
        assert_eq!(seen.reports, 0);
        assert!(second.record().answers().is_empty());
    }

    #[tokio::test]
    async fn run_is_idempotent_once_finished() {
        let (frontend, seen) = QueueFrontend::new(QueueFrontend::raw(&["1", "2"]));
        let mut runner = AttemptRunner::new(scenario(), frontend, config()).unwrap();
        runner.run().await.unwrap();
        assert_eq!(runner.run().await.unwrap(), AttemptStatus::Completed);
        assert_eq!(seen.lock().unwrap().reports, 1);
    }

    #[tokio::test]
    async fn ill_typed_references_are_refused_at_init() {
        let def = ExerciseDefinition::builder("bad", "Bad")
            .field(FieldSpec::new("a", ValueKind::Integer))
            .rubric(KeyedRubric::new().check("a", Check::Equals(1.into())))
            .the_solution(AnswerSet::new().with("a", "one"))
            .build()
            .unwrap();
        let (frontend, seen) = QueueFrontend::new(vec![]);
        let err = AttemptRunner::new(def, frontend, config()).err().unwrap();
        assert!(matches!(err, DefinitionError::IllTypedReference { .. }));
        assert!(seen.lock().unwrap().prompts.is_empty());
    }

    #[tokio::test]
    async fn rubric_defect_is_reported_not_refused() {
        let def = ExerciseDefinition::builder("faulty", "Faulty")
            .field(FieldSpec::new("a", ValueKind::Integer))
            .field(FieldSpec::new("b", ValueKind::Integer))
            .rubric(|field: &FieldSpec, value: &Value| -> Result<FieldScore, RubricError> {
                match field.id.as_str() {
                    "b" => Err(RubricError::failed("b rubric broken")),
                    _ => Ok(FieldScore::pass_fail(field, *value == Value::Integer(1))),
                }
            })
            .the_solution(AnswerSet::new().with("a", 1).with("b", 2))
            .build()
            .unwrap();

        let (frontend, seen) = QueueFrontend::new(QueueFrontend::raw(&["1", "2"]));
        let mut runner = AttemptRunner::new(def, frontend, config()).unwrap();
        let status = runner.run().await.unwrap();

        assert_eq!(status, AttemptStatus::Completed);
        let record = runner.record();
        assert!(record.is_sealed());
        assert_eq!(record.defects().len(), 1);
        assert_eq!(record.defects()[0].field, "b");
        assert_eq!(record.defects()[0].value, Value::Integer(2));
        assert_eq!(record.scores().get("a"), Some(&1.0));
        assert_eq!(record.scores().get("b"), Some(&0.0));
        assert_eq!(record.max_total_score(), 2.0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.prompts.len(), 2);
        assert_eq!(seen.reports, 1);
        assert!(format_summary(record, false).contains("rubric defect on 'b' for 2: "));
    }

    #[tokio::test]
    async fn same_answers_score_the_same_across_attempts() {
        let mut sheets = Vec::new();
        for seed in [1, 99] {
            let (frontend, _) = QueueFrontend::new(QueueFrontend::raw(&["1", "7"]));
            let config = RunnerConfig {
                retry_cap: 3,
                seed: Some(seed),
            };
            let mut runner = AttemptRunner::new(scenario(), frontend, config).unwrap();
            runner.run().await.unwrap();
            let record = runner.into_record();
            assert_eq!(record.seed(), seed);
            sheets.push((record.scores().clone(), record.max_scores().clone()));
        }
        assert_eq!(sheets[0], sheets[1]);
    }

    #[tokio::test]
    async fn batch_runs_each_exercise_with_its_own_frontend() {
        let pool: ExercisePool = [scenario(), scenario()].into_iter().collect();
        let mut answers = VecDeque::from(vec![vec!["1", "2"], vec!["1", "9"]]);
        let entries = run_batch(
            &pool,
            |_| QueueFrontend::new(QueueFrontend::raw(&answers.pop_front().unwrap())).0,
            &config(),
            2,
        )
        .await;

        assert_eq!(entries.len(), 2);
        let totals: Vec<f64> = entries
            .iter()
            .map(|e| e.record.as_ref().unwrap().total_score())
            .collect();
        assert_eq!(totals, vec![2.0, 1.0]);
        assert!(entries.iter().all(|e| e.outcome.is_ok()));
    }
}
