//! The frontend contract.
//!
//! A frontend is any presentation surface (terminal, notebook cell, a
//! pre-recorded answer sheet) that can show a prompt, hand back one raw
//! answer, and show the final report. The engine owns its frontend for the
//! duration of one attempt and talks to it only through this trait.

use async_trait::async_trait;

use crate::error::FrontendError;
use crate::model::FieldSpec;
use crate::results::ExerciseRecord;

/// Everything a frontend needs to ask for one field.
#[derive(Debug, Clone)]
pub struct FieldPrompt<'a> {
    pub exercise_id: &'a str,
    pub title: &'a str,
    /// Static exercise text.
    pub preamble: &'a str,
    pub field: &'a FieldSpec,
    /// Zero-based position of the field.
    pub index: usize,
    /// Number of fields in the exercise.
    pub total: usize,
    /// One-based count of inputs requested for this field so far.
    pub attempt: u32,
    /// Why the previous input for this field was rejected.
    pub error: Option<String>,
}

impl FieldPrompt<'_> {
    /// True for the very first prompt of an attempt.
    pub fn is_first(&self) -> bool {
        self.index == 0 && self.attempt == 1
    }
}

/// What a frontend hands back for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collected {
    /// Raw learner input, still to be validated.
    Raw(String),
    /// The learner skipped the field.
    Skip,
    /// The frontend gave up waiting; counts as a malformed input.
    TimedOut,
}

/// Presentation adapter driven by the attempt engine.
#[async_trait]
pub trait Frontend: Send {
    /// Human-readable adapter name (e.g. "console").
    fn name(&self) -> &str;

    /// Show a field prompt and any static exercise text.
    async fn render(&mut self, prompt: &FieldPrompt<'_>) -> Result<(), FrontendError>;

    /// Wait for one raw answer for `field`.
    async fn collect(&mut self, field: &FieldSpec) -> Result<Collected, FrontendError>;

    /// Show the finished record. Called exactly once per completed attempt.
    async fn report(&mut self, record: &ExerciseRecord) -> Result<(), FrontendError>;
}

#[async_trait]
impl<T: Frontend + ?Sized> Frontend for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn render(&mut self, prompt: &FieldPrompt<'_>) -> Result<(), FrontendError> {
        (**self).render(prompt).await
    }

    async fn collect(&mut self, field: &FieldSpec) -> Result<Collected, FrontendError> {
        (**self).collect(field).await
    }

    async fn report(&mut self, record: &ExerciseRecord) -> Result<(), FrontendError> {
        (**self).report(record).await
    }
}
