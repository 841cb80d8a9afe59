//! postmill CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use postmill::{
    browser::Credentials,
    context::RunContext,
    error::Result,
    gateway::OpenAiGateway,
    models::Config,
    pipeline::{self, RunReport},
    storage::LocalStorage,
};

/// postmill - feed harvesting and scheduled content generation
#[derive(Parser, Debug)]
#[command(
    name = "postmill",
    version,
    about = "Harvest high-engagement posts and generate scheduled content batches"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Cancel the run after this many seconds
    #[arg(long)]
    max_runtime_secs: Option<u64>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run full pipeline: Harvest → Generate → Publish
    Run,

    /// Harvest and archive raw posts only
    Harvest {
        /// Harvest a single target
        #[arg(long)]
        target: Option<String>,
    },

    /// Generate and publish from a pre-harvested CSV
    Generate {
        /// CSV with username, post_text[, likes][, target] columns
        #[arg(long)]
        input: PathBuf,
    },

    /// Validate the configuration file
    Validate,

    /// List stored batch directories for a target
    Batches {
        #[arg(long)]
        target: String,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Cancel the run on Ctrl-C.
fn cancel_on_interrupt(ctx: &RunContext) {
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling run");
            cancel.cancel();
        }
    });
}

/// Log the summary and turn a run with failed targets into a non-zero exit.
fn finish(report: &RunReport) -> Result<()> {
    report.log_summary();
    if !report.is_clean() {
        log::warn!("Run completed with failures");
    }
    report.ensure_clean()
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("postmill starting...");

    if let Command::Validate = cli.command {
        log::info!("Validating {}...", cli.config.display());
        let config = Config::load(&cli.config)?;
        if let Err(e) = config.validate() {
            log::error!("Config validation failed: {}", e);
            return Err(e);
        }
        log::info!(
            "✓ Config OK ({} targets, {} accounts, model {})",
            config.targets.len(),
            config.accounts.len(),
            config.gateway.model
        );
        return Ok(());
    }

    let config = Config::load_or_default(&cli.config);
    let headless = config.session.headless && !cli.headed;
    let ctx = RunContext::new(config)?;
    cancel_on_interrupt(&ctx);
    if let Some(secs) = cli.max_runtime_secs.or(ctx.config.pipeline.max_runtime_secs) {
        ctx.cancel_after(secs);
    }

    let storage = LocalStorage::from_config(&ctx.config.storage);

    match cli.command {
        Command::Run => {
            let gateway = Arc::new(OpenAiGateway::from_config(&ctx.config.gateway)?);
            let credentials = Credentials::all_from_env(&ctx.config.session.credentials_env_prefix);
            log::info!("{} operator account(s) found", credentials.len());

            let report = pipeline::run_all(&ctx, &storage, gateway, &credentials, headless).await;
            finish(&report)?;
        }

        Command::Harvest { target } => {
            let credentials = Credentials::all_from_env(&ctx.config.session.credentials_env_prefix);
            let report =
                pipeline::run_harvest(&ctx, &storage, &credentials, headless, target.as_deref())
                    .await?;
            finish(&report)?;
        }

        Command::Generate { input } => {
            let gateway = Arc::new(OpenAiGateway::from_config(&ctx.config.gateway)?);
            let report = pipeline::run_generate(&ctx, &storage, gateway, &input).await?;
            finish(&report)?;
        }

        Command::Batches { target } => {
            let dirs = pipeline::list_batches(&storage, &target).await?;
            if dirs.is_empty() {
                log::info!("No batches stored for '{}'", target);
            }
            for dir in dirs {
                log::info!("{}/{}", target, dir);
            }
            log::info!("Latest: {}", storage.latest_path(&target).display());
        }

        Command::Validate => {}
    }

    log::info!("Done!");

    Ok(())
}
