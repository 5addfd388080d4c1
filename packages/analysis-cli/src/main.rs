//! CLI for running response analysis against Postgres
//!
//! Every command prints a single JSON document on stdout; logs go to stderr.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use citation_analysis::{
    driver::{self, DriverOptions, DriverRequest},
    pipeline::default_prompts,
    AnalysisSink, AnalysisSummary, CompanyId, DailySentiment, DomainTables, OpenAICompletion,
    PostgresStore, RateLimitedCompletion, ResponseId, SourceClassifier,
};
use config::Config;
use openai_client::OpenAIClient;

#[derive(Parser)]
#[command(name = "citation-analysis")]
#[command(about = "Analyse AI answer-engine responses for a company")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse every unprocessed response in an id range
    Process {
        #[arg(long)]
        company: CompanyId,
        #[arg(long)]
        start: ResponseId,
        #[arg(long)]
        end: ResponseId,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        retry_limit: Option<u32>,
    },

    /// Analyse a single response
    Single {
        #[arg(long)]
        company: CompanyId,
        #[arg(long)]
        response: ResponseId,
    },

    /// Run a JSON driver request, e.g. '{"responseId": 101, "companyId": 7}'
    Run { request: String },

    /// Summarise analysed responses for a company
    Report {
        #[arg(long)]
        company: CompanyId,
    },

    /// Insert the default analysis prompts if they are missing
    SeedPrompts,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    company_id: CompanyId,
    summary: AnalysisSummary,
    by_engine: BTreeMap<String, AnalysisSummary>,
    daily_sentiment: Vec<DailySentiment>,
}

#[derive(Serialize)]
struct SeedResult {
    seeded: Vec<String>,
    existing: Vec<String>,
}

fn output(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,citation_analysis=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let store = PostgresStore::new(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let store = Arc::new(store);

    match cli.command {
        Commands::Process {
            company,
            start,
            end,
            batch_size,
            retry_limit,
        } => {
            let request = DriverRequest::Range {
                batch_size,
                retry_limit,
                start_id: start,
                end_id: end,
                company_id: company,
            };
            cmd_run(&config, store, &request).await
        }
        Commands::Single { company, response } => {
            cmd_run(&config, store, &DriverRequest::single(response, company)).await
        }
        Commands::Run { request } => {
            let request: DriverRequest =
                serde_json::from_str(&request).context("Invalid driver request")?;
            cmd_run(&config, store, &request).await
        }
        Commands::Report { company } => cmd_report(store, company).await,
        Commands::SeedPrompts => cmd_seed_prompts(store).await,
    }
}

fn completion_service(config: &Config) -> Result<RateLimitedCompletion<OpenAICompletion>> {
    let api_key = config
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY must be set")?;

    let mut client = OpenAIClient::new(api_key)
        .with_timeout(Duration::from_secs(config.completion_timeout_secs))?;
    if let Some(url) = &config.openai_base_url {
        client = client.with_base_url(url);
    }

    let completion = OpenAICompletion::new(client).with_model(&config.analysis_model);
    Ok(RateLimitedCompletion::new(
        completion,
        config.completion_rate_per_second,
    ))
}

fn classifier(config: &Config) -> Result<SourceClassifier> {
    match &config.domain_tables_path {
        Some(path) => {
            let tables = DomainTables::from_json_file(path)
                .with_context(|| format!("Failed to load domain tables from {}", path.display()))?;
            info!(path = %path.display(), "Loaded domain tables");
            Ok(SourceClassifier::new(Arc::new(tables)))
        }
        None => Ok(SourceClassifier::default()),
    }
}

/// Cancel the token on the first Ctrl-C. In-flight units finish.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight units");
            child.cancel();
        }
    });
    token
}

async fn cmd_run(config: &Config, store: Arc<PostgresStore>, request: &DriverRequest) -> Result<()> {
    let options = DriverOptions {
        queue: config.queue_config(),
        extractor: config.extractor_config(),
        classifier: classifier(config)?,
        retry_passes: config.retry_passes,
        cancel: cancel_on_ctrl_c(),
    };

    let response = driver::run(store, completion_service(config)?, request, &options).await?;
    output(&response)
}

async fn cmd_report(store: Arc<PostgresStore>, company_id: CompanyId) -> Result<()> {
    let rows = store.list_analyzed(company_id).await?;
    info!(company_id, rows = rows.len(), "Building report");

    output(&Report {
        company_id,
        summary: citation_analysis::summarize(rows.iter().map(|(_, record)| record)),
        by_engine: citation_analysis::summarize_by_engine(&rows),
        daily_sentiment: citation_analysis::daily_sentiment(&rows),
    })
}

async fn cmd_seed_prompts(store: Arc<PostgresStore>) -> Result<()> {
    let defaults = citation_analysis::ExtractorConfig::default();
    let [system, user] = defaults.prompt_names();

    let mut result = SeedResult {
        seeded: Vec::new(),
        existing: Vec::new(),
    };
    for prompt in default_prompts(system, user) {
        if store.seed_prompt(&prompt).await? {
            result.seeded.push(prompt.name);
        } else {
            result.existing.push(prompt.name);
        }
    }

    output(&result)
}
