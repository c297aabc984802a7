//! Scripted frontend for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use exforge_core::error::FrontendError;
use exforge_core::model::FieldSpec;
use exforge_core::results::ExerciseRecord;
use exforge_core::traits::{Collected, FieldPrompt, Frontend};

/// One scripted reaction to a `collect` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Hand back this raw input.
    Input(String),
    /// Skip the field.
    Skip,
    /// Report a timeout for the field.
    TimedOut,
    /// Fail with a frontend error.
    Fail(String),
    /// Never answer; only cancellation ends the wait.
    Hang,
}

impl From<&str> for Step {
    fn from(raw: &str) -> Self {
        Step::Input(raw.to_string())
    }
}

/// A prompt as the scripted frontend saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptLog {
    pub exercise: String,
    pub field: String,
    pub attempt: u32,
    pub error: Option<String>,
}

/// Everything the engine did to a [`ScriptedFrontend`].
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    pub prompts: Vec<PromptLog>,
    pub collect_calls: u32,
    pub reports: Vec<ExerciseRecord>,
}

/// Shared view of a transcript that stays usable after the frontend is
/// handed to a runner.
#[derive(Debug, Clone, Default)]
pub struct TranscriptHandle(Arc<Mutex<Transcript>>);

impl TranscriptHandle {
    fn lock(&self) -> MutexGuard<'_, Transcript> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Transcript {
        self.lock().clone()
    }

    pub fn prompts(&self) -> Vec<PromptLog> {
        self.lock().prompts.clone()
    }

    pub fn collect_calls(&self) -> u32 {
        self.lock().collect_calls
    }

    pub fn report_count(&self) -> usize {
        self.lock().reports.len()
    }
}

/// A frontend that plays a fixed script of answers.
///
/// Running out of script is reported as a closed input.
pub struct ScriptedFrontend {
    steps: VecDeque<Step>,
    transcript: TranscriptHandle,
    render_failure: Option<String>,
}

impl ScriptedFrontend {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            transcript: TranscriptHandle::default(),
            render_failure: None,
        }
    }

    /// A script of raw inputs.
    pub fn answers(inputs: &[&str]) -> Self {
        Self::new(inputs.iter().map(|s| Step::from(*s)))
    }

    /// Fail every `render` call with `message`.
    pub fn failing_render(mut self, message: impl Into<String>) -> Self {
        self.render_failure = Some(message.into());
        self
    }

    pub fn transcript(&self) -> TranscriptHandle {
        self.transcript.clone()
    }

    /// Steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

#[async_trait]
impl Frontend for ScriptedFrontend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn render(&mut self, prompt: &FieldPrompt<'_>) -> Result<(), FrontendError> {
        if let Some(message) = &self.render_failure {
            return Err(FrontendError::Other(message.clone()));
        }
        self.transcript.lock().prompts.push(PromptLog {
            exercise: prompt.exercise_id.to_string(),
            field: prompt.field.id.clone(),
            attempt: prompt.attempt,
            error: prompt.error.clone(),
        });
        Ok(())
    }

    async fn collect(&mut self, field: &FieldSpec) -> Result<Collected, FrontendError> {
        self.transcript.lock().collect_calls += 1;
        match self.steps.pop_front() {
            Some(Step::Input(raw)) => Ok(Collected::Raw(raw)),
            Some(Step::Skip) => Ok(Collected::Skip),
            Some(Step::TimedOut) => Ok(Collected::TimedOut),
            Some(Step::Fail(message)) => Err(FrontendError::Other(message)),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(FrontendError::Closed(field.id.clone())),
        }
    }

    async fn report(&mut self, record: &ExerciseRecord) -> Result<(), FrontendError> {
        self.transcript.lock().reports.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exforge_core::model::ValueKind;

    #[tokio::test]
    async fn plays_script_in_order() {
        let mut frontend = ScriptedFrontend::new([Step::from("1"), Step::Skip, Step::TimedOut]);
        let field = FieldSpec::new("a", ValueKind::Integer);

        assert_eq!(frontend.collect(&field).await.unwrap(), Collected::Raw("1".into()));
        assert_eq!(frontend.collect(&field).await.unwrap(), Collected::Skip);
        assert_eq!(frontend.collect(&field).await.unwrap(), Collected::TimedOut);
        assert!(matches!(
            frontend.collect(&field).await,
            Err(FrontendError::Closed(_))
        ));
        assert_eq!(frontend.transcript().collect_calls(), 4);
        assert_eq!(frontend.remaining(), 0);
    }

    #[tokio::test]
    async fn render_failure_is_reported() {
        let mut frontend = ScriptedFrontend::answers(&["1"]).failing_render("screen gone");
        let field = FieldSpec::new("a", ValueKind::Integer);
        let prompt = FieldPrompt {
            exercise_id: "x",
            title: "X",
            preamble: "",
            field: &field,
            index: 0,
            total: 1,
            attempt: 1,
            error: None,
        };
        assert!(matches!(
            frontend.render(&prompt).await,
            Err(FrontendError::Other(m)) if m == "screen gone"
        ));
        assert!(frontend.transcript().prompts().is_empty());
    }
}
