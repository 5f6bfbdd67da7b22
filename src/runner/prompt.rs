//! Interactive task entry

use crate::models::Task;
use crate::Result;
use async_trait::async_trait;
use colored::Colorize;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

/// Word that ends an interactive session
const EXIT_COMMAND: &str = "exit";

/// Source of tasks entered one at a time
#[async_trait]
pub trait TaskPrompt: Send {
    /// `None` ends the session
    async fn next_task(&mut self) -> Result<Option<Task>>;
}

/// Prompts on stdout and reads one line each for the step and its criteria
pub struct LinePrompt<R> {
    reader: R,
}

pub type StdinPrompt = LinePrompt<BufReader<Stdin>>;

impl StdinPrompt {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R> LinePrompt<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    async fn ask(&mut self, message: &str) -> Result<Option<String>> {
        print!("{} {}\n{} ", "step-verifier".green(), message, ">".green());
        std::io::stdout().flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[async_trait]
impl<R> TaskPrompt for LinePrompt<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_task(&mut self) -> Result<Option<Task>> {
        let description = match self.ask("Input a test step").await? {
            Some(line) if line != EXIT_COMMAND => line,
            _ => return Ok(None),
        };

        // empty steps are handed back so the runner can re-prompt
        if description.is_empty() {
            return Ok(Some(Task::new(description, "")));
        }

        let criteria = match self.ask("Input acceptance criteria").await? {
            Some(line) => line,
            None => return Ok(None),
        };

        Ok(Some(Task::new(description, criteria)))
    }
}
