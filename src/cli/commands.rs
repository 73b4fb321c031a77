//! CLI argument definitions and the evaluation command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use crate::dataset::{load_jsonl, subsample, HumanEvalPackLoader, Problem};
use crate::evaluation::{Evaluator, EvaluatorConfig, FencedBlockExtractor};
use crate::llm::{LiteLlmClient, LlmProvider, DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::sandbox::{CodeSandbox, SandboxConfig, CODE_EXECUTION_TIMEOUT};
use crate::scaffold::AgentConfig;

/// Run HumanEvalFix evaluation for the code-fixing agent.
#[derive(Parser, Debug)]
#[command(name = "patchloop")]
#[command(about = "Run HumanEvalFix evaluation for the AI code-fixing agent")]
#[command(version)]
#[command(
    long_about = "patchloop gives a language model a Python interpreter and asks it to fix buggy functions.\n\nEach fix is graded once against the hidden tests and the pass@1 score is reported.\n\nExample usage:\n  patchloop --subsample 20 --model mistral:7b-instruct"
)]
pub struct Cli {
    /// Number of problems to run from the dataset. Set to 0 to run all.
    #[arg(long, default_value = "20")]
    pub subsample: usize,

    /// Local JSONL file of problems instead of the HuggingFace dataset.
    #[arg(long)]
    pub dataset_file: Option<PathBuf>,

    /// Model served by the OpenAI-compatible endpoint.
    #[arg(short = 'm', long, env = "LITELLM_DEFAULT_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the OpenAI-compatible endpoint.
    #[arg(long, env = "LITELLM_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// API key for the endpoint, if it needs one.
    #[arg(long, env = "LITELLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Maximum number of tool-using turns per problem.
    #[arg(long, default_value = "25")]
    pub max_turns: usize,

    /// Wall-clock limit for one problem's agent run, in seconds. 0 disables it.
    #[arg(long, default_value = "600")]
    pub loop_timeout: u64,

    /// Python interpreter used for tool calls and validation.
    #[arg(long, default_value = "python3")]
    pub python: PathBuf,

    /// Print the summary as JSON instead of the text report.
    #[arg(long)]
    pub json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    fn agent_config(&self) -> AgentConfig {
        let loop_timeout = (self.loop_timeout > 0).then(|| Duration::from_secs(self.loop_timeout));
        AgentConfig::default()
            .with_model(self.model.clone())
            .with_max_turns(self.max_turns)
            .with_loop_timeout(loop_timeout)
    }
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
///
/// For more control over logging initialization, use `parse_cli()` and `run_with_cli()`.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let problems = load_problems(&cli).await?;

    let llm_client: Arc<dyn LlmProvider> = Arc::new(LiteLlmClient::new(
        cli.api_base.clone(),
        cli.api_key.clone(),
        cli.model.clone(),
    )?);
    let sandbox = Arc::new(CodeSandbox::new(
        SandboxConfig::new(&cli.python).with_timeout(CODE_EXECUTION_TIMEOUT),
    ));
    let extractor = Arc::new(
        FencedBlockExtractor::python()
            .map_err(|e| anyhow::anyhow!("invalid extraction pattern: {e}"))?,
    );

    info!(
        model = %cli.model,
        api_base = %cli.api_base,
        interpreter = %cli.python.display(),
        max_turns = cli.max_turns,
        "Evaluator configured"
    );

    let evaluator = Evaluator::new(
        llm_client,
        sandbox,
        extractor,
        EvaluatorConfig::new().with_agent(cli.agent_config()),
    );
    let summary = evaluator.run(&problems).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("\n{}", summary.render());
    }

    Ok(())
}

async fn load_problems(cli: &Cli) -> anyhow::Result<Vec<Problem>> {
    let problems = match &cli.dataset_file {
        Some(path) => {
            info!(path = %path.display(), "Loading problems from file");
            load_jsonl(path)?
        }
        None => {
            info!("Loading dataset 'bigcode/humanevalpack'...");
            let limit = (cli.subsample > 0).then_some(cli.subsample);
            HumanEvalPackLoader::new()?.load(limit).await?
        }
    };

    let problems = subsample(problems, cli.subsample);
    if cli.subsample > 0 {
        info!(count = problems.len(), "Using a subsample of problems");
    } else {
        info!(count = problems.len(), "Using the full dataset");
    }
    Ok(problems)
}
