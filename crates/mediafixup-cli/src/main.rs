//! mediafixup - runs the configured fixups against a Plex Media Server.

use anyhow::{Context, Result};
use clap::Parser;
use mediafixup_core::config::AppConfig;
use mediafixup_core::{
    ConfigFile, FixupOutcome, FixupRegistry, Orchestrator, PlexConnector, RunContext,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "mediafixup", version)]
#[command(about = "Run configurable fixups against the media database of a Plex Media Server")]
struct Args {
    /// Path name of the config file
    #[arg(required_unless_present_any = ["help_config", "list_fixups"])]
    config_file: Option<PathBuf>,

    /// Show more messages
    #[arg(short, long)]
    verbose: bool,

    /// Dryrun mode: do not change anything on the server or in files
    #[arg(short = 'n', long)]
    dryrun: bool,

    /// Show help about the config file and exit
    #[arg(long)]
    help_config: bool,

    /// List the available fixups and exit
    #[arg(long)]
    list_fixups: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Set up logging; RUST_LOG takes precedence over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match run(args).await {
        Ok(status) => ExitCode::from(status),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<u8> {
    if args.help_config {
        println!("{}", ConfigFile::help());
        return Ok(0);
    }

    let registry = FixupRegistry::with_builtin();
    if args.list_fixups {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(0);
    }

    let path = args
        .config_file
        .context("No config file specified")?;
    let config = ConfigFile::load(&path)?;
    info!(
        "{} {}: loaded config file {}",
        AppConfig::APP_NAME,
        AppConfig::VERSION,
        path.display()
    );

    let connector = PlexConnector::new(
        config.data().connection()?,
        config.data().client_identifier.clone(),
    );
    let ctx = RunContext::new(args.dryrun, args.verbose);
    let orchestrator = Orchestrator::new(registry, config, ctx);

    let report = orchestrator.run(&connector).await?;
    for outcome in &report.outcomes {
        match &outcome.outcome {
            FixupOutcome::Failed(message) => {
                error!("Fixup {} failed: {}", outcome.name, message)
            }
            FixupOutcome::NotRun => info!("Fixup {} not run", outcome.name),
            _ => {}
        }
    }
    info!(
        "{} fixups succeeded, {} skipped, {} failed",
        report.count(&FixupOutcome::Succeeded),
        report.count(&FixupOutcome::Skipped),
        report.count(&FixupOutcome::Failed(String::new()))
    );

    Ok(if report.succeeded() { 0 } else { 1 })
}
