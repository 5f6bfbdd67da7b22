//! Scripted collaborators shared by unit tests

use crate::actions::ActionExecutor;
use crate::browser::{PageDriver, PageSnapshotter};
use crate::error::VerifierError;
use crate::llm::{ChatMessage, ChatModel};
use crate::models::PageSnapshot;
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

/// Chat model that replays a fixed list of responses
pub(crate) struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat_complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(VerifierError::Llm("script exhausted".to_string())))
    }
}

/// In-memory page that records every interaction
pub(crate) struct FakePage {
    snapshot: PageSnapshot,
    pub fail_screenshot: bool,
    pub fail_selector: Option<String>,
    snapshots: AtomicU32,
    screenshots: AtomicU32,
    interactions: Mutex<Vec<String>>,
    snapshot_times: Mutex<Vec<Instant>>,
}

impl FakePage {
    pub fn new(content: &str) -> Self {
        Self {
            snapshot: PageSnapshot {
                url: "http://localhost/form".to_string(),
                title: "Contact form".to_string(),
                content: content.to_string(),
            },
            fail_screenshot: false,
            fail_selector: None,
            snapshots: AtomicU32::new(0),
            screenshots: AtomicU32::new(0),
            interactions: Mutex::new(Vec::new()),
            snapshot_times: Mutex::new(Vec::new()),
        }
    }

    /// When each snapshot was taken, on the tokio clock
    pub fn snapshot_times(&self) -> Vec<Instant> {
        self.snapshot_times.lock().unwrap().clone()
    }

    pub fn snapshot_count(&self) -> u32 {
        self.snapshots.load(Ordering::SeqCst)
    }

    pub fn screenshot_count(&self) -> u32 {
        self.screenshots.load(Ordering::SeqCst)
    }

    pub fn interactions(&self) -> Vec<String> {
        self.interactions.lock().unwrap().clone()
    }

    fn interact(&self, entry: String, selector: Option<&str>) -> Result<()> {
        if let (Some(fail), Some(selector)) = (&self.fail_selector, selector) {
            if fail == selector {
                return Err(VerifierError::Browser(format!("no such element: {}", selector)));
            }
        }
        self.interactions.lock().unwrap().push(entry);
        Ok(())
    }
}

#[async_trait]
impl PageSnapshotter for FakePage {
    async fn snapshot(&self) -> Result<PageSnapshot> {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        self.snapshot_times.lock().unwrap().push(Instant::now());
        Ok(self.snapshot.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.screenshots.fetch_add(1, Ordering::SeqCst);
        if self.fail_screenshot {
            return Err(VerifierError::Browser("screenshot unavailable".to_string()));
        }
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.interact(format!("navigate {}", url), None)
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.interact(format!("click {}", selector), Some(selector))
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        self.interact(format!("fill {} {}", selector, text), Some(selector))
    }

    async fn press(&self, key: &str) -> Result<()> {
        self.interact(format!("press {}", key), None)
    }
}

/// Executor that fails a set number of times before succeeding
pub(crate) struct FlakyExecutor {
    failures_left: AtomicU32,
    calls: AtomicU32,
    last_success: Mutex<Option<Instant>>,
}

impl FlakyExecutor {
    pub fn failing(times: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(times),
            calls: AtomicU32::new(0),
            last_success: Mutex::new(None),
        }
    }

    pub fn reliable() -> Self {
        Self::failing(0)
    }

    pub fn always_failing() -> Self {
        Self::failing(u32::MAX)
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// When the most recent successful call returned, on the tokio clock
    pub fn last_success(&self) -> Option<Instant> {
        *self.last_success.lock().unwrap()
    }
}

#[async_trait]
impl ActionExecutor for FlakyExecutor {
    async fn execute(&self, task: &str) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(VerifierError::Execution(format!(
                "could not perform '{}' (call {})",
                task, call
            )));
        }
        *self.last_success.lock().unwrap() = Some(Instant::now());
        Ok(())
    }
}
