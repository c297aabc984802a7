//! Line-oriented terminal frontend.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

use exforge_core::error::FrontendError;
use exforge_core::model::FieldSpec;
use exforge_core::report::format_summary;
use exforge_core::results::ExerciseRecord;
use exforge_core::traits::{Collected, FieldPrompt, Frontend};

/// Typing this instead of an answer skips the field.
pub const SKIP_COMMAND: &str = ":skip";

/// Prompts on a writer and reads one line per answer from a reader.
pub struct ConsoleFrontend<R, W> {
    reader: R,
    writer: W,
    debug: bool,
    timeout: Option<Duration>,
    /// Bytes of the current line; survives a timed-out or cancelled read.
    pending: Vec<u8>,
}

impl ConsoleFrontend<BufReader<Stdin>, Stdout> {
    /// A console on the process's stdin/stdout.
    pub fn stdio(debug: bool) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), debug)
    }
}

impl<R, W> ConsoleFrontend<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, debug: bool) -> Self {
        Self {
            reader,
            writer,
            debug,
            timeout: None,
            pending: Vec::new(),
        }
    }

    /// Give up on a field after `timeout` without input.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }

    async fn write(&mut self, text: &str) -> Result<(), FrontendError> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<R, W> Frontend for ConsoleFrontend<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &str {
        "console"
    }

    async fn render(&mut self, prompt: &FieldPrompt<'_>) -> Result<(), FrontendError> {
        let mut text = String::new();
        if prompt.is_first() {
            text.push_str(&format!("\n== {} ==\n", prompt.title));
            if !prompt.preamble.is_empty() {
                text.push_str(prompt.preamble);
                text.push('\n');
            }
            text.push('\n');
        }
        if let Some(error) = &prompt.error {
            text.push_str(&format!("  ! {error} (try {})\n", prompt.attempt));
        }
        text.push_str(&format!(
            "[{}/{}] {} ({}): ",
            prompt.index + 1,
            prompt.total,
            prompt.field.label,
            prompt.field.kind
        ));
        self.write(&text).await
    }

    async fn collect(&mut self, field: &FieldSpec) -> Result<Collected, FrontendError> {
        // `read_until` keeps partial input in `pending` when dropped, so a
        // half-typed line carries over to the next collect.
        let read = match self.timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.reader.read_until(b'\n', &mut self.pending))
                    .await
                {
                    Ok(read) => read?,
                    Err(_) => {
                        self.write("\n").await?;
                        return Ok(Collected::TimedOut);
                    }
                }
            }
            None => self.reader.read_until(b'\n', &mut self.pending).await?,
        };

        if read == 0 && self.pending.is_empty() {
            return Err(FrontendError::Closed(field.id.clone()));
        }

        let bytes = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&bytes);
        let answer = line.trim_end_matches(['\r', '\n']);
        if answer.trim() == SKIP_COMMAND {
            Ok(Collected::Skip)
        } else {
            Ok(Collected::Raw(answer.to_string()))
        }
    }

    async fn report(&mut self, record: &ExerciseRecord) -> Result<(), FrontendError> {
        let summary = format_summary(record, self.debug);
        self.write(&format!("\n{summary}")).await
    }
}
