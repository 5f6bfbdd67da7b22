//! Batch runner
//!
//! Feeds tasks through the processor strictly one at a time: all tasks
//! share a single browser page. Batch mode stops at the first fatal error;
//! interactive mode reports it and asks for the next task.

use crate::models::{ResultCollector, Task, TaskResult, TaskStatus};
use crate::processor::TaskProcessor;
use crate::Result;
use colored::Colorize;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub mod prompt;
pub use prompt::{LinePrompt, StdinPrompt, TaskPrompt};

pub struct BatchRunner {
    run_id: Uuid,
    processor: TaskProcessor,
    results: ResultCollector,
}

impl BatchRunner {
    pub fn new(processor: TaskProcessor) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            processor,
            results: ResultCollector::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Process every task in order, stopping at the first fatal error.
    ///
    /// Results recorded before the error remain available.
    pub async fn run_batch(&mut self, tasks: &[Task]) -> Result<()> {
        let span = info_span!("batch", run_id = %self.run_id, tasks = tasks.len());
        self.process_all(tasks).instrument(span).await
    }

    /// Read tasks from `prompt` until it is exhausted.
    ///
    /// Task failures are reported and the session continues; only prompt
    /// I/O errors end it early.
    pub async fn run_interactive(&mut self, prompt: &mut dyn TaskPrompt) -> Result<()> {
        let span = info_span!("interactive", run_id = %self.run_id);
        self.prompt_loop(prompt).instrument(span).await
    }

    async fn process_all(&mut self, tasks: &[Task]) -> Result<()> {
        for (index, task) in tasks.iter().enumerate() {
            info!(task_index = index + 1, task = %task.description, "Starting task");

            if let Err(e) = self.processor.process(task, &mut self.results).await {
                error!(
                    task_index = index + 1,
                    remaining = tasks.len() - index - 1,
                    error = %e,
                    "Fatal task error, stopping batch"
                );
                return Err(e);
            }
        }

        self.log_summary();
        Ok(())
    }

    async fn prompt_loop(&mut self, prompt: &mut dyn TaskPrompt) -> Result<()> {
        while let Some(task) = prompt.next_task().await? {
            if task.description.trim().is_empty() {
                println!("{}", "Please input a test step or press CTRL+C to exit".red());
                continue;
            }

            match self.processor.process(&task, &mut self.results).await {
                Ok(result) => match result.status {
                    TaskStatus::Passed => {
                        println!("{}", format!("Step \"{}\" passed", result.task).bold().green())
                    }
                    TaskStatus::Failed => println!(
                        "{}",
                        format!("Step \"{}\" failed: {}", result.task, result.details)
                            .bold()
                            .red()
                    ),
                },
                Err(e) => {
                    error!(task = %task.description, error = %e, "Task aborted");
                    eprintln!("{}", format!("Error processing step: {}", e).bold().red());
                }
            }
        }

        self.log_summary();
        Ok(())
    }

    pub fn results(&self) -> &[TaskResult] {
        self.results.as_slice()
    }

    pub fn into_results(self) -> Vec<TaskResult> {
        self.results.into_vec()
    }

    fn log_summary(&self) {
        let results = self.results.as_slice();
        let passed = results
            .iter()
            .filter(|r| r.status == TaskStatus::Passed)
            .count();
        let failed = results.len() - passed;

        if failed > 0 {
            warn!(total = results.len(), passed, failed, "Run finished with failures");
        } else {
            info!(total = results.len(), passed, "Run finished");
        }
    }
}
