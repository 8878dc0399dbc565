use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use redline::comparison::ContractComparison;
use redline::config::Config;
use redline::document::load_document;
use redline::llm::{EchoGateway, GroqClient, LlmGateway, RetryingGateway};
use redline::pipeline::load_stages;

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging(config: &Config) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("redline")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("redline.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let default_level = config.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

struct CompareArgs<'a> {
    doc1: &'a Path,
    doc2: &'a Path,
    output: &'a Path,
    state_json: Option<&'a Path>,
    dry_run: bool,
}

async fn run_application(cli: &Cli, config: Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Compare {
            doc1,
            doc2,
            output,
            state_json,
            dry_run,
            model,
        } => {
            let mut config = config;
            if let Some(model) = model {
                config.llm.model = model.clone();
            }
            let args = CompareArgs {
                doc1,
                doc2,
                output,
                state_json: state_json.as_deref(),
                dry_run: *dry_run,
            };
            handle_compare_command(&args, &config, cli.is_verbose()).await
        }
        Commands::Stages => handle_stages_command(&config),
    }
}

fn build_gateway(config: &Config, dry_run: bool) -> Result<Arc<dyn LlmGateway>> {
    if dry_run {
        info!("Dry run: using echo gateway");
        return Ok(Arc::new(EchoGateway));
    }

    let client = GroqClient::new(config.llm.groq_config())
        .with_context(|| format!("Missing credential: set {}", config.llm.api_key_env))?;
    Ok(Arc::new(RetryingGateway::new(client, config.retry.policy())))
}

async fn handle_compare_command(args: &CompareArgs<'_>, config: &Config, verbose: bool) -> Result<()> {
    info!(
        "Comparing {} with {} (model: {})",
        args.doc1.display(),
        args.doc2.display(),
        config.llm.model
    );

    // Credential check comes before any document work
    let gateway = build_gateway(config, args.dry_run)?;
    let comparison = ContractComparison::from_config(config, gateway).context("Failed to build pipeline")?;

    let doc1 = load_document(args.doc1).context("Failed to load first document")?;
    let doc2 = load_document(args.doc2).context("Failed to load second document")?;
    println!(
        "{} {} ({}) vs {} ({})",
        "Comparing:".green(),
        doc1.name,
        doc1.format,
        doc2.name,
        doc2.format
    );

    if args.dry_run {
        println!("{}", "Dry run: prompts are echoed, no model is called".yellow());
    }
    println!(
        "{} running {} stages with {}",
        "Pipeline:".cyan(),
        comparison.executor().stages().len(),
        config.llm.model
    );

    let outcome = comparison.run(&doc1, &doc2).await.context("Comparison failed")?;

    if verbose {
        for timing in &outcome.metadata.stages {
            println!(
                "  {} {} ms, {} tokens",
                timing.stage.cyan(),
                timing.elapsed_ms,
                timing.usage.total()
            );
        }
    }

    fs::write(args.output, outcome.report.to_markdown())
        .with_context(|| format!("Failed to write report to {}", args.output.display()))?;
    println!("{} {}", "Report written:".green(), args.output.display());

    if let Some(path) = args.state_json {
        outcome
            .write_state_json(path)
            .with_context(|| format!("Failed to write state to {}", path.display()))?;
        println!("{} {}", "State written:".green(), path.display());
    }

    println!(
        "{} {} tokens in {} ms",
        "Done:".green(),
        outcome.metadata.usage.total(),
        (outcome.metadata.finished_at - outcome.metadata.started_at).num_milliseconds()
    );
    Ok(())
}

fn handle_stages_command(config: &Config) -> Result<()> {
    let stages = load_stages(config.prompts.dir.as_deref()).context("Failed to load stage templates")?;
    for (index, stage) in stages.iter().enumerate() {
        println!(
            "{}. {} [{}] {} -> {}",
            index + 1,
            stage.name.cyan(),
            format!("{:?}", stage.kind).to_lowercase(),
            stage.inputs.join(", "),
            stage.output.green()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config).context("Failed to setup logging")?;
    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, config).await.context("Application failed")?;

    Ok(())
}
