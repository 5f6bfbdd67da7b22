//! Core data models for the step verifier

use crate::error::VerifierError;
use crate::Result;
use sha2::{Digest, Sha256};
use std::fmt;

/// Details recorded when a task never reached a verdict
pub const ERROR_DETAILS: &str = "error occurred";

//
// ================= Task =================
//

/// One manual test step with the acceptance criteria that define its success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub description: String,
    pub acceptance_criteria: String,
}

impl Task {
    pub fn new(description: impl Into<String>, acceptance_criteria: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            acceptance_criteria: acceptance_criteria.into(),
        }
    }

    /// Normalize two raw source fields into a task.
    ///
    /// Returns `Ok(None)` for a blank row. `row` is 1-based and only used
    /// for error reporting.
    pub fn from_fields(row: usize, description: &str, criteria: &str) -> Result<Option<Self>> {
        let description = description.trim();
        let criteria = criteria.trim();

        if description.is_empty() && criteria.is_empty() {
            return Ok(None);
        }

        if description.is_empty() {
            return Err(VerifierError::InvalidTask {
                row,
                message: "test step description is empty".to_string(),
            });
        }

        Ok(Some(Self::new(description, criteria)))
    }
}

//
// ================= Page =================
//

/// Textual summary of the current page, taken fresh before each verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub content: String,
}

impl PageSnapshot {
    /// SHA256 of the snapshot, hex encoded
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.url.as_bytes());
        hasher.update([0]);
        hasher.update(self.title.as_bytes());
        hasher.update([0]);
        hasher.update(self.content.as_bytes());
        hex::encode(hasher.finalize())
    }
}

//
// ================= Verification =================
//

/// Outcome of the verification pipeline.
///
/// A reason exists exactly when the criteria were not met.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationVerdict {
    Passed,
    Failed { reason: String },
}

impl VerificationVerdict {
    pub fn passed(&self) -> bool {
        matches!(self, VerificationVerdict::Passed)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            VerificationVerdict::Passed => None,
            VerificationVerdict::Failed { reason } => Some(reason),
        }
    }
}

//
// ================= Results =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Passed,
    Failed,
}

impl TaskStatus {
    pub const PASSED_LABEL: &'static str = "Passed";
    pub const FAILED_LABEL: &'static str = "Failed";

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Passed => Self::PASSED_LABEL,
            TaskStatus::Failed => Self::FAILED_LABEL,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            Self::PASSED_LABEL => Some(TaskStatus::Passed),
            Self::FAILED_LABEL => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

impl From<&VerificationVerdict> for TaskStatus {
    fn from(verdict: &VerificationVerdict) -> Self {
        if verdict.passed() {
            TaskStatus::Passed
        } else {
            TaskStatus::Failed
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One row of the result sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub task: String,
    pub criteria: String,
    pub status: TaskStatus,
    pub details: String,
}

impl TaskResult {
    pub fn from_verdict(task: &Task, verdict: &VerificationVerdict) -> Self {
        Self {
            task: task.description.clone(),
            criteria: task.acceptance_criteria.clone(),
            status: TaskStatus::from(verdict),
            details: verdict.reason().unwrap_or_default().to_string(),
        }
    }

    /// Result for a task that never produced a verdict
    pub fn errored(task: &Task) -> Self {
        Self {
            task: task.description.clone(),
            criteria: task.acceptance_criteria.clone(),
            status: TaskStatus::Failed,
            details: ERROR_DETAILS.to_string(),
        }
    }
}

/// Append-only, ordered collection of task results.
///
/// Processors may only append; reading back is left to the runner that owns it.
#[derive(Debug, Default)]
pub struct ResultCollector {
    results: Vec<TaskResult>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: TaskResult) {
        self.results.push(result);
    }

    pub(crate) fn as_slice(&self) -> &[TaskResult] {
        &self.results
    }

    pub(crate) fn into_vec(self) -> Vec<TaskResult> {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_round_trip() {
        for status in [TaskStatus::Passed, TaskStatus::Failed] {
            assert_eq!(TaskStatus::from_label(status.label()), Some(status));
        }
        assert_eq!(TaskStatus::from_label("Zaliczony"), None);
        assert_eq!(TaskStatus::Passed.to_string(), "Passed");
        assert_eq!(TaskStatus::Failed.to_string(), "Failed");
    }

    #[test]
    fn test_verdict_reason_invariant() {
        let passed = VerificationVerdict::Passed;
        assert!(passed.passed());
        assert!(passed.reason().is_none());

        let failed = VerificationVerdict::Failed {
            reason: "no confirmation shown".to_string(),
        };
        assert!(!failed.passed());
        assert_eq!(failed.reason(), Some("no confirmation shown"));
    }

    #[test]
    fn test_result_from_verdict() {
        let task = Task::new("submit the form", "a confirmation message appears");

        let ok = TaskResult::from_verdict(&task, &VerificationVerdict::Passed);
        assert_eq!(ok.status, TaskStatus::Passed);
        assert_eq!(ok.details, "");

        let failed = TaskResult::from_verdict(
            &task,
            &VerificationVerdict::Failed {
                reason: "error banner".to_string(),
            },
        );
        assert_eq!(failed.status, TaskStatus::Failed);
        assert_eq!(failed.details, "error banner");
        assert_eq!(failed.criteria, "a confirmation message appears");
    }

    #[test]
    fn test_task_from_fields() {
        assert!(Task::from_fields(2, "  ", "").unwrap().is_none());

        let task = Task::from_fields(2, " open page ", " title is Home ")
            .unwrap()
            .unwrap();
        assert_eq!(task, Task::new("open page", "title is Home"));

        let err = Task::from_fields(7, "", "something").unwrap_err();
        assert!(matches!(err, VerifierError::InvalidTask { row: 7, .. }));
    }

    #[test]
    fn test_snapshot_hash_changes_with_content() {
        let a = PageSnapshot {
            url: "http://x".to_string(),
            title: "T".to_string(),
            content: "one".to_string(),
        };
        let mut b = a.clone();
        assert_eq!(a.content_hash(), b.content_hash());
        b.content = "two".to_string();
        assert_ne!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash().len(), 64);
    }
}
