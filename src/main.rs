// ============================================================================
// File: src/main.rs
// Entry point, CLI handling and the interactive loop
// ============================================================================

mod config;
mod display;
mod history;
mod llm_client;
mod markdown;
mod models;
mod orchestrator;
mod topic_gate;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::config::{Config, API_KEY_ENV};
use crate::history::{FailurePolicy, Session};
use crate::llm_client::{CompletionClient, OpenAiCompatBackend};
use crate::markdown::MarkdownExporter;
use crate::orchestrator::{KnowledgePipeline, PipelineOutcome};

/// Command-line arguments for the knowledge finder
#[derive(Parser, Debug)]
#[command(name = "ikf")]
#[command(about = "Answer Islam-related questions with references from an LLM", long_about = None)]
struct Args {
    /// Path to an optional JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Completion API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Model identifier
    #[arg(short, long)]
    model: Option<String>,

    /// Attempts per completion call
    #[arg(long)]
    max_retries: Option<usize>,

    /// Output-length ceiling per completion
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Topic keyword (repeatable); replaces the configured list
    #[arg(long = "keyword")]
    keywords: Vec<String>,

    /// Keep searches that failed to reach the API in the session history
    #[arg(long)]
    record_failures: bool,

    /// Where the references of a successful search are written (default README.md).
    /// The file is overwritten on every referenced answer.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not write the references to a Markdown file
    #[arg(long, conflicts_with = "output")]
    no_readme: bool,

    /// Ask a single question and exit instead of starting a session
    #[arg(short, long)]
    query: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(api_key) = self.api_key {
            config.api_key = api_key;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if !self.keywords.is_empty() {
            config.keywords = self.keywords;
        }
        if self.record_failures {
            config.failure_policy = FailurePolicy::Persist;
        }
        if let Some(output) = self.output {
            config.readme_path = Some(output);
        }
        if self.no_readme {
            config.readme_path = None;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(args.config.as_deref())?;
    let one_shot = args.query.clone();
    args.apply(&mut config);

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e).context("Cannot start without a valid configuration");
    }

    let backend = OpenAiCompatBackend::new(&config);
    let client = CompletionClient::new(Box::new(backend), config.max_retries);
    let pipeline = KnowledgePipeline::new(config.topic_gate(), client);

    let mut session = Session::new(config.failure_policy);
    info!(model = %config.model, policy = ?config.failure_policy, "Session started");

    match one_shot {
        Some(query) => ask(&pipeline, &mut session, &config, &query).await,
        None => run_repl(&pipeline, session, &config).await,
    }
}

async fn run_repl(pipeline: &KnowledgePipeline, mut session: Session, config: &Config) -> Result<()> {
    display::print_header();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "›".bright_cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            ":quit" | ":q" | ":exit" => break,
            ":help" => display::print_help(),
            ":history" => display::print_history(&session.history),
            ":clear" => {
                info!(searches = session.history.len(), "Session cleared");
                session = Session::new(config.failure_policy);
                println!("{}", "Started a new session.".bright_black());
            }
            query => ask(pipeline, &mut session, config, query).await?,
        }
    }

    info!(
        searches = session.history.len(),
        since = %session.started_at.format("%H:%M:%S"),
        "Session ended"
    );
    Ok(())
}

async fn ask(pipeline: &KnowledgePipeline, session: &mut Session, config: &Config, query: &str) -> Result<()> {
    let spinner = display::create_spinner("Searching...");
    let result = pipeline.run(session, query).await;
    spinner.finish_and_clear();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            println!("{} {}", "⚠".yellow().bold(), e);
            return Ok(());
        }
    };

    display::print_outcome(&outcome);

    if let (PipelineOutcome::Referenced { references, .. }, Some(path)) = (&outcome, &config.readme_path) {
        match MarkdownExporter::new(references).export(path) {
            Ok(()) => println!(
                "\n{} {} has been updated!",
                "✓".green().bold(),
                path.display().to_string().bright_cyan()
            ),
            Err(e) => {
                error!(error = %format!("{e:#}"), "README export failed");
                println!("\n{} {:#}", "⚠".yellow().bold(), e);
            }
        }
    }

    Ok(())
}
