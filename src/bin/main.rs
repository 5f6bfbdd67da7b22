use clap::Parser;
use step_verifier::{
    actions::{LlmActionExecutor, ScriptRecorder},
    browser::{PageDriver, WebDriverSession},
    config::{Cli, RunConfig},
    llm::{ChatModel, OpenAiClient},
    processor::TaskProcessor,
    runner::{BatchRunner, StdinPrompt},
    sinks::write_results,
    sources::load_tasks,
    verification::VerificationPipeline,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RunConfig::from_cli(cli)?;
    info!(url = %config.url, headless = config.headless, "Step verifier starting");

    // Load tasks before opening a browser so a bad file fails fast
    let tasks = match &config.tasks_path {
        Some(path) => Some(load_tasks(path)?),
        None => None,
    };

    let session = Arc::new(
        WebDriverSession::start(
            &config.webdriver_url,
            config.headless,
            config.viewport,
            config.request_timeout,
        )
        .await?,
    );

    let outcome = run(&config, session.clone(), tasks).await;

    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close browser session");
    }

    outcome
}

async fn run(
    config: &RunConfig,
    session: Arc<WebDriverSession>,
    tasks: Option<Vec<step_verifier::Task>>,
) -> Result<(), Box<dyn std::error::Error>> {
    session.navigate(&config.url).await?;

    let client = OpenAiClient::new(
        config.api_key.clone(),
        config.model.clone(),
        &config.openai_base_url,
        config.request_timeout,
    )?;
    info!(model = client.model(), "LLM client ready");
    let model: Arc<dyn ChatModel> = Arc::new(client);
    let retry = config.retry_policy();

    let mut executor = LlmActionExecutor::new(model.clone(), session.clone(), retry.clone());
    if let Some(path) = &config.script_path {
        executor = executor.with_recorder(ScriptRecorder::create(path).await?);
    }

    let processor = TaskProcessor::new(
        Arc::new(executor),
        session,
        VerificationPipeline::new(model, retry),
        config.processor_config(),
    );
    let mut runner = BatchRunner::new(processor);
    info!(run_id = %runner.run_id(), "Runner ready");

    let outcome = tokio::select! {
        outcome = async {
            match &tasks {
                Some(tasks) => runner.run_batch(tasks).await,
                None => runner.run_interactive(&mut StdinPrompt::stdin()).await,
            }
        } => outcome,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, saving results");
            Ok(())
        }
    };

    // Results recorded so far are written even when the run halted early
    write_results(&config.results_path, runner.results())?;

    if let Err(e) = outcome {
        error!(error = %e, "Run halted");
        return Err(Box::new(e));
    }

    Ok(())
}
