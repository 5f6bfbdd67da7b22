//! Verification pipeline
//!
//! Three chained LLM calls turn a page snapshot and free-text acceptance
//! criteria into a verdict:
//!
//! ANALYZE → JUDGE → (PASSED | REASON → FAILED)
//!
//! Stage 2 is parsed strictly: anything other than a literal boolean counts
//! as "criteria not met". Stage 3 only runs on the failing path.

use crate::llm::{ChatMessage, ChatModel};
use crate::models::{PageSnapshot, VerificationVerdict};
use crate::retry::RetryPolicy;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

mod prompts;

/// Pipeline state, logged on each transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Analyzing,
    Judging,
    Reasoning,
}

pub struct VerificationPipeline {
    model: Arc<dyn ChatModel>,
    retry: RetryPolicy,
}

impl VerificationPipeline {
    pub fn new(model: Arc<dyn ChatModel>, retry: RetryPolicy) -> Self {
        Self { model, retry }
    }

    /// Verify `criteria` against a freshly taken snapshot.
    ///
    /// Only infrastructure failures surface as errors, after the retry policy
    /// is exhausted. An unmet or unparseable judgment is a `Failed` verdict.
    pub async fn verify(&self, criteria: &str, snapshot: &PageSnapshot) -> Result<VerificationVerdict> {
        debug!(stage = ?Stage::Analyzing, url = %snapshot.url, "Verification stage");
        let analysis = self.analyze(criteria, snapshot).await?;

        debug!(stage = ?Stage::Judging, analysis_len = analysis.len(), "Verification stage");
        if self.judge(&analysis).await? {
            info!(passed = true, "Acceptance criteria met");
            return Ok(VerificationVerdict::Passed);
        }

        debug!(stage = ?Stage::Reasoning, "Verification stage");
        let reason = self.explain(&analysis).await?;

        info!(passed = false, reason = %reason, "Acceptance criteria not met");
        Ok(VerificationVerdict::Failed { reason })
    }

    async fn analyze(&self, criteria: &str, snapshot: &PageSnapshot) -> Result<String> {
        let messages = [
            ChatMessage::system(prompts::analysis_system(criteria, snapshot)),
            ChatMessage::user(prompts::ANALYSIS_USER),
        ];
        let analysis = self.complete("analysis", &messages).await?;
        debug!(analysis = %analysis, "Step-by-step analysis");
        Ok(analysis)
    }

    async fn judge(&self, analysis: &str) -> Result<bool> {
        let messages = [
            ChatMessage::system(prompts::judgment_system(analysis)),
            ChatMessage::user(prompts::JUDGMENT_USER),
        ];
        let response = self.complete("judgment", &messages).await?;

        Ok(match parse_judgment(&response) {
            Some(passed) => passed,
            None => {
                warn!(response = %response, "Could not parse judgment as a boolean, treating as not passed");
                false
            }
        })
    }

    async fn explain(&self, analysis: &str) -> Result<String> {
        let messages = [
            ChatMessage::system(prompts::reason_system(analysis)),
            ChatMessage::user(prompts::REASON_USER),
        ];
        let reason = self.complete("failure_reason", &messages).await?;
        Ok(reason.trim().to_string())
    }

    async fn complete(&self, label: &str, messages: &[ChatMessage]) -> Result<String> {
        let model = &self.model;
        self.retry
            .call(label, || async move { model.chat_complete(messages).await })
            .await
    }
}

/// Accept only a literal JSON boolean; whitespace around it is allowed
pub fn parse_judgment(response: &str) -> Option<bool> {
    match serde_json::from_str::<serde_json::Value>(response) {
        Ok(serde_json::Value::Bool(value)) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VerifierError;
    use crate::testing::ScriptedModel;

    fn snapshot(content: &str) -> PageSnapshot {
        PageSnapshot {
            url: "http://localhost/form".to_string(),
            title: "Contact".to_string(),
            content: content.to_string(),
        }
    }

    fn pipeline(model: Arc<ScriptedModel>) -> VerificationPipeline {
        VerificationPipeline::new(model, RetryPolicy::immediate(3))
    }

    #[test]
    fn test_parse_judgment_literals() {
        assert_eq!(parse_judgment("true"), Some(true));
        assert_eq!(parse_judgment("false"), Some(false));
        assert_eq!(parse_judgment("  true\n"), Some(true));
    }

    #[test]
    fn test_parse_judgment_rejects_non_booleans() {
        for response in ["maybe", "True", "\"true\"", "1", "0", "null", "true false", "", "{\"passed\":true}", "[true]"] {
            assert_eq!(parse_judgment(response), None, "accepted {:?}", response);
        }
    }

    #[tokio::test]
    async fn test_passing_path_skips_reason() {
        let model = Arc::new(ScriptedModel::replies(&[
            "The confirmation message 'Thank you' is visible. Criteria met.",
            "true",
        ]));

        let verdict = pipeline(model.clone())
            .verify("a confirmation message appears", &snapshot("<p>Thank you</p>"))
            .await
            .unwrap();

        assert_eq!(verdict, VerificationVerdict::Passed);
        assert!(verdict.reason().is_none());
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_path_asks_for_reason() {
        let model = Arc::new(ScriptedModel::replies(&[
            "An error banner is shown instead of a confirmation.",
            "false",
            "  Error banner shown; no confirmation message.\n",
        ]));

        let verdict = pipeline(model.clone())
            .verify("a confirmation message appears", &snapshot("<div>Error</div>"))
            .await
            .unwrap();

        assert!(!verdict.passed());
        assert_eq!(verdict.reason(), Some("Error banner shown; no confirmation message."));
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_unparseable_judgment_defaults_to_failed() {
        let model = Arc::new(ScriptedModel::replies(&["unclear", "maybe", "Could not confirm."]));

        let verdict = pipeline(model.clone())
            .verify("a confirmation message appears", &snapshot(""))
            .await
            .unwrap();

        assert_eq!(
            verdict,
            VerificationVerdict::Failed {
                reason: "Could not confirm.".to_string()
            }
        );
        // judgment is not re-asked; the third call is the reason stage
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_stages_chain_outputs() {
        let model = Arc::new(ScriptedModel::replies(&["ANALYSIS-TEXT", "false", "why"]));

        pipeline(model.clone())
            .verify("heading says Hello", &snapshot("<h1>Bye</h1>"))
            .await
            .unwrap();

        let calls = model.calls();
        assert!(calls[0][0].content.contains("heading says Hello"));
        assert!(calls[0][0].content.contains("<h1>Bye</h1>"));
        assert!(calls[0][0].content.contains("http://localhost/form"));
        assert!(calls[1][0].content.contains("ANALYSIS-TEXT"));
        assert!(calls[2][0].content.contains("ANALYSIS-TEXT"));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_per_stage() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err(VerifierError::Llm("503".to_string())),
            Ok("all good".to_string()),
            Err(VerifierError::Llm("timeout".to_string())),
            Ok("true".to_string()),
        ]));

        let verdict = pipeline(model.clone())
            .verify("page loads", &snapshot("ok"))
            .await
            .unwrap();

        assert!(verdict.passed());
        assert_eq!(model.call_count(), 4);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_error() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err(VerifierError::Llm("down".to_string())),
            Err(VerifierError::Llm("down".to_string())),
            Err(VerifierError::Llm("still down".to_string())),
        ]));

        let result = pipeline(model.clone())
            .verify("page loads", &snapshot("ok"))
            .await;

        assert!(matches!(result, Err(VerifierError::Llm(ref msg)) if msg == "still down"));
        assert_eq!(model.call_count(), 3);
    }
}
