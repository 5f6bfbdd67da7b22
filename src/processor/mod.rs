//! Task processor
//!
//! EXECUTE → (screenshot) → SETTLE → SNAPSHOT → VERIFY → RECORD
//!
//! Only action execution is retried. Once a verdict exists, positive or
//! negative, the task is finished.

use crate::actions::ActionExecutor;
use crate::browser::PageSnapshotter;
use crate::error::VerifierError;
use crate::models::{ResultCollector, Task, TaskResult, TaskStatus};
use crate::verification::VerificationPipeline;
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub max_attempts: u32,
    /// Wait between a successful action and the snapshot
    pub settle_delay: Duration,
    /// Directory for diagnostic screenshots; `None` disables them
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            settle_delay: DEFAULT_SETTLE_DELAY,
            screenshot_dir: None,
        }
    }
}

pub struct TaskProcessor {
    executor: Arc<dyn ActionExecutor>,
    page: Arc<dyn PageSnapshotter>,
    pipeline: VerificationPipeline,
    config: ProcessorConfig,
}

impl TaskProcessor {
    pub fn new(
        executor: Arc<dyn ActionExecutor>,
        page: Arc<dyn PageSnapshotter>,
        pipeline: VerificationPipeline,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            executor,
            page,
            pipeline,
            config,
        }
    }

    /// Execute and verify one task, appending exactly one result to `results`.
    ///
    /// Returns `TaskExhausted` when every execution attempt failed, or the
    /// underlying error when the snapshot or verification could not run.
    /// In both cases a failed result is still recorded.
    pub async fn process(&self, task: &Task, results: &mut ResultCollector) -> Result<TaskResult> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        info!(task = %task.description, "Processing task");

        let last_error = loop {
            attempt += 1;
            info!(task = %task.description, attempt, max_attempts, "Attempt started");

            if let Err(e) = self.executor.execute(&task.description).await {
                warn!(task = %task.description, attempt, max_attempts, error = %e, "Action execution failed");
                if attempt >= max_attempts {
                    break e;
                }
                continue;
            }

            info!(task = %task.description, attempt, "Action executed");

            self.capture_screenshot(attempt).await;
            tokio::time::sleep(self.config.settle_delay).await;

            let result = match self.verify(task).await {
                Ok(result) => result,
                Err(e) => {
                    error!(task = %task.description, error = %e, "Verification could not run");
                    results.record(TaskResult::errored(task));
                    return Err(e);
                }
            };

            match result.status {
                TaskStatus::Passed => info!(task = %task.description, "Task passed"),
                TaskStatus::Failed => {
                    info!(task = %task.description, details = %result.details, "Task failed")
                }
            }

            results.record(result.clone());
            return Ok(result);
        };

        error!(
            task = %task.description,
            attempts = attempt,
            "Maximum attempts exceeded, aborting task"
        );
        results.record(TaskResult::errored(task));

        Err(VerifierError::TaskExhausted {
            task: task.description.clone(),
            attempts: attempt,
            last_error: Box::new(last_error),
        })
    }

    async fn verify(&self, task: &Task) -> Result<TaskResult> {
        let snapshot = self.page.snapshot().await?;
        info!(
            url = %snapshot.url,
            snapshot_hash = %snapshot.content_hash(),
            "Verifying page"
        );

        let verdict = self
            .pipeline
            .verify(&task.acceptance_criteria, &snapshot)
            .await?;

        info!(passed = verdict.passed(), "Verdict reached");
        Ok(TaskResult::from_verdict(task, &verdict))
    }

    /// Best-effort diagnostic screenshot; failures are only logged
    async fn capture_screenshot(&self, attempt: u32) {
        let Some(dir) = &self.config.screenshot_dir else {
            return;
        };

        let path = dir.join(format!(
            "{}-attempt{}.png",
            chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f"),
            attempt
        ));

        let saved = async {
            let png = self.page.screenshot().await?;
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, png).await?;
            Ok::<_, VerifierError>(())
        }
        .await;

        match saved {
            Ok(()) => info!(path = %path.display(), "Screenshot saved"),
            Err(e) => warn!(error = %e, "Could not save screenshot"),
        }
    }
}
