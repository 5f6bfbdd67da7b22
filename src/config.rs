//! Process configuration
//!
//! Every option can come from the command line or the environment (a `.env`
//! file is loaded by the binary before parsing).

use crate::browser::Viewport;
use crate::error::VerifierError;
use crate::llm::openai::DEFAULT_BASE_URL;
use crate::processor::ProcessorConfig;
use crate::retry::{ExponentialBackoff, RetryPolicy};
use crate::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "step-verifier", version, about = "Run natural-language test steps against a web page and verify them with an LLM")]
pub struct Cli {
    /// Chat model used for actions and verification
    #[arg(short, long, env = "OPENAI_MODEL", default_value = "gpt-4-1106-preview")]
    pub model: String,

    /// Page to open before the first task
    #[arg(short, long, env = "TARGET_URL")]
    pub url: String,

    /// Browser viewport as WIDTH,HEIGHT
    #[arg(short, long, env = "VIEWPORT", default_value = "1280,720")]
    pub viewport: String,

    /// Run the browser without a window and save a screenshot after each action
    #[arg(long, env = "HEADLESS")]
    pub headless: bool,

    /// Task list (.csv, .xlsx, .xls, .ods); interactive mode when omitted
    #[arg(short = 'c', long = "tasks", env = "TASKS_PATH")]
    pub tasks: Option<PathBuf>,

    /// Result file (.xlsx or .csv)
    #[arg(short, long, env = "RESULTS_PATH", default_value = "results.xlsx")]
    pub results: PathBuf,

    /// Where to record the executed browser steps
    #[arg(short = 'o', long = "script", env = "SCRIPT_PATH")]
    pub script: Option<PathBuf>,

    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:9515")]
    pub webdriver_url: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Wait after each action before verifying, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub settle_ms: u64,

    /// Action attempts per task before the task is aborted
    #[arg(long, default_value_t = crate::processor::DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Attempts per LLM call
    #[arg(long, default_value_t = crate::retry::DEFAULT_MAX_ATTEMPTS)]
    pub llm_attempts: u32,

    /// Timeout for a single LLM or WebDriver request, in seconds
    #[arg(long, default_value_t = 120)]
    pub request_timeout_secs: u64,

    #[arg(long, default_value = "screenshots")]
    pub screenshot_dir: PathBuf,
}

/// Validated settings for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub model: String,
    pub url: String,
    pub viewport: Viewport,
    pub headless: bool,
    pub tasks_path: Option<PathBuf>,
    pub results_path: PathBuf,
    pub script_path: Option<PathBuf>,
    pub webdriver_url: String,
    pub openai_base_url: String,
    pub api_key: String,
    pub settle_delay: Duration,
    pub max_attempts: u32,
    pub llm_attempts: u32,
    pub request_timeout: Duration,
    pub screenshot_dir: PathBuf,
}

impl RunConfig {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let viewport = cli.viewport.parse()?;

        let api_key = cli
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| VerifierError::Config("OPENAI_API_KEY not set".to_string()))?;

        if cli.url.trim().is_empty() {
            return Err(VerifierError::Config("target URL is empty".to_string()));
        }

        if cli.max_attempts == 0 || cli.llm_attempts == 0 {
            return Err(VerifierError::Config("attempt counts must be at least 1".to_string()));
        }

        Ok(Self {
            model: cli.model,
            url: cli.url,
            viewport,
            headless: cli.headless,
            tasks_path: cli.tasks,
            results_path: cli.results,
            script_path: cli.script,
            webdriver_url: cli.webdriver_url,
            openai_base_url: cli.openai_base_url,
            api_key,
            settle_delay: Duration::from_millis(cli.settle_ms),
            max_attempts: cli.max_attempts,
            llm_attempts: cli.llm_attempts,
            request_timeout: Duration::from_secs(cli.request_timeout_secs),
            screenshot_dir: cli.screenshot_dir,
        })
    }

    /// Shared policy for every LLM call
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.llm_attempts, Arc::new(ExponentialBackoff::default()))
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            max_attempts: self.max_attempts,
            settle_delay: self.settle_delay,
            screenshot_dir: self.headless.then(|| self.screenshot_dir.clone()),
        }
    }
}
