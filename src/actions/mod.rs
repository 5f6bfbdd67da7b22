//! Action execution
//!
//! Turns a natural-language test step into primitive browser steps with the
//! LLM, then runs them in order. Any failure here is an execution failure,
//! which the task processor retries.

use crate::browser::PageDriver;
use crate::error::VerifierError;
use crate::llm::{ChatMessage, ChatModel};
use crate::models::PageSnapshot;
use crate::retry::RetryPolicy;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub mod script;
pub use script::ScriptRecorder;

/// Longest wait a single step may request
const MAX_WAIT_MS: u64 = 10_000;

/// Performs one test step on the page
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, task: &str) -> Result<()>;
}

/// Primitive step the model may ask for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum BrowserStep {
    Navigate { url: String },
    Click { selector: String },
    Fill { selector: String, text: String },
    Press { key: String },
    Wait { ms: u64 },
}

impl fmt::Display for BrowserStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserStep::Navigate { url } => write!(f, "navigate {}", url),
            BrowserStep::Click { selector } => write!(f, "click {}", selector),
            BrowserStep::Fill { selector, .. } => write!(f, "fill {}", selector),
            BrowserStep::Press { key } => write!(f, "press {}", key),
            BrowserStep::Wait { ms } => write!(f, "wait {}ms", ms),
        }
    }
}

pub struct LlmActionExecutor {
    model: Arc<dyn ChatModel>,
    page: Arc<dyn PageDriver>,
    retry: RetryPolicy,
    recorder: Option<ScriptRecorder>,
}

impl LlmActionExecutor {
    pub fn new(model: Arc<dyn ChatModel>, page: Arc<dyn PageDriver>, retry: RetryPolicy) -> Self {
        Self {
            model,
            page,
            retry,
            recorder: None,
        }
    }

    /// Append every executed task to a replayable script
    pub fn with_recorder(mut self, recorder: ScriptRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    async fn plan(&self, task: &str, snapshot: &PageSnapshot) -> Result<Vec<BrowserStep>> {
        let messages = [
            ChatMessage::system(build_prompt(snapshot)),
            ChatMessage::user(task),
        ];
        let model = &self.model;
        let messages = &messages[..];

        let response = self
            .retry
            .call("action_plan", || async move { model.chat_complete(messages).await })
            .await?;

        parse_steps(&response)
    }

    async fn run_step(&self, step: &BrowserStep) -> Result<()> {
        match step {
            BrowserStep::Navigate { url } => self.page.navigate(url).await,
            BrowserStep::Click { selector } => self.page.click(selector).await,
            BrowserStep::Fill { selector, text } => self.page.fill(selector, text).await,
            BrowserStep::Press { key } => self.page.press(key).await,
            BrowserStep::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis((*ms).min(MAX_WAIT_MS))).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ActionExecutor for LlmActionExecutor {
    async fn execute(&self, task: &str) -> Result<()> {
        let snapshot = self.page.snapshot().await?;
        let steps = self.plan(task, &snapshot).await?;

        if steps.is_empty() {
            info!(task, "Model returned no browser steps");
        }

        for (i, step) in steps.iter().enumerate() {
            debug!(task, step = %step, index = i + 1, "Running browser step");
            self.run_step(step).await.map_err(|e| {
                VerifierError::Execution(format!("step {} ({}) failed: {}", i + 1, step, e))
            })?;
        }

        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.append(task, &steps).await {
                warn!(error = %e, "Could not record test script");
            }
        }

        Ok(())
    }
}

fn build_prompt(snapshot: &PageSnapshot) -> String {
    format!(
        r#"You are a test automation engineer driving a web browser. Translate the user's test step into browser steps.

Context:
- The browser is already open.
- Current page URL: {url}
- Current page title: {title}
- Page outline:
```
{content}
```

Available steps:
- {{ "action": "navigate", "url": "<absolute url>" }}
- {{ "action": "click", "selector": "<css selector>" }}
- {{ "action": "fill", "selector": "<css selector>", "text": "<text to type>" }}
- {{ "action": "press", "key": "<Enter | Tab | Escape | ArrowDown | ...>" }}
- {{ "action": "wait", "ms": <milliseconds, at most {max_wait}> }}

Rules:
- Use only selectors that match elements in the page outline
- Prefer id, name and aria-label attributes in selectors
- Return ONLY a JSON array of steps
- No explanation text
"#,
        url = snapshot.url,
        title = snapshot.title,
        content = snapshot.content,
        max_wait = MAX_WAIT_MS,
    )
}

/// Parse the model's step list, tolerating markdown fences and a `{"steps": [...]}` wrapper
pub fn parse_steps(response: &str) -> Result<Vec<BrowserStep>> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let json: serde_json::Value = serde_json::from_str(cleaned).map_err(|e| {
        VerifierError::Execution(format!(
            "Failed to parse browser steps: {} | raw={}",
            e, response
        ))
    })?;

    let steps = match json {
        serde_json::Value::Object(mut map) => map.remove("steps").ok_or_else(|| {
            VerifierError::Execution("No steps in response".to_string())
        })?,
        other => other,
    };

    serde_json::from_value(steps)
        .map_err(|e| VerifierError::Execution(format!("Invalid browser steps: {}", e)))
}
