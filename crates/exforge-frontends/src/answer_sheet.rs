//! Frontend that replays pre-recorded answers.
//!
//! Each field gets the raw answer recorded on the sheet. A field without an
//! entry is skipped. A malformed entry is offered again on every re-ask, so
//! it ends up as "no answer" once the retry cap is reached.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use exforge_core::error::FrontendError;
use exforge_core::model::FieldSpec;
use exforge_core::parser::{AnswerSheet, SheetAttempt};
use exforge_core::report::format_summary;
use exforge_core::results::ExerciseRecord;
use exforge_core::traits::{Collected, FieldPrompt, Frontend};

pub struct AnswerSheetFrontend<W> {
    answers: BTreeMap<String, String>,
    writer: W,
    debug: bool,
}

impl AnswerSheetFrontend<tokio::io::Stdout> {
    /// Replay `exercise`'s answers from `sheet`, echoing to stdout.
    pub fn stdout(sheet: &AnswerSheet, exercise: &str, debug: bool) -> Self {
        Self::new(sheet.for_exercise(exercise), tokio::io::stdout(), debug)
    }
}

impl<W: AsyncWrite + Unpin + Send> AnswerSheetFrontend<W> {
    pub fn new(attempt: Option<&SheetAttempt>, writer: W, debug: bool) -> Self {
        if attempt.is_none() {
            tracing::debug!("answer sheet has no entry; every field will be skipped");
        }
        Self {
            answers: attempt.map(|a| a.answers.clone()).unwrap_or_default(),
            writer,
            debug,
        }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    async fn write(&mut self, text: &str) -> Result<(), FrontendError> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Frontend for AnswerSheetFrontend<W> {
    fn name(&self) -> &str {
        "answer_sheet"
    }

    async fn render(&mut self, prompt: &FieldPrompt<'_>) -> Result<(), FrontendError> {
        let mut text = String::new();
        if prompt.is_first() {
            text.push_str(&format!("\n== {} ==\n", prompt.title));
        }
        if let Some(error) = &prompt.error {
            text.push_str(&format!("  ! {error}\n"));
        }
        let answer = self
            .answers
            .get(&prompt.field.id)
            .map(String::as_str)
            .unwrap_or("<skipped>");
        text.push_str(&format!("{}: {answer}\n", prompt.field.label));
        self.write(&text).await
    }

    async fn collect(&mut self, field: &FieldSpec) -> Result<Collected, FrontendError> {
        Ok(match self.answers.get(&field.id) {
            Some(raw) => Collected::Raw(raw.clone()),
            None => Collected::Skip,
        })
    }

    async fn report(&mut self, record: &ExerciseRecord) -> Result<(), FrontendError> {
        let summary = format_summary(record, self.debug);
        self.write(&summary).await
    }
}
