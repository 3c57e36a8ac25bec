use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::cli::{CommonArgs, CommonCommands, utils};
use eraser::{ErasureClient, IdSource};

#[derive(Parser)]
#[command(name = "tweeraser")]
#[command(about = "tweeraser - bulk-delete your tweets")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    erase: EraseArgs,

    #[command(subcommand)]
    command: Option<TweeraserCommands>,
}

#[derive(Args, Debug, Default)]
struct EraseArgs {
    #[arg(
        long,
        value_name = "PATH",
        conflicts_with = "zip_file",
        help = "Erase the tweets listed in a tweets.csv export"
    )]
    csv_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Erase the tweets listed in an export archive containing tweets.csv"
    )]
    zip_file: Option<PathBuf>,

    #[arg(long, help = "Also retry tweets already erased or not found in earlier runs")]
    no_check: bool,
}

#[derive(Subcommand)]
enum TweeraserCommands {
    #[command(flatten)]
    Common(CommonCommands),
}

impl Default for TweeraserCommands {
    fn default() -> Self {
        Self::Common(CommonCommands::Erase)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on CLI arguments
    utils::init_logging(&cli.common);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = utils::load_config(cli.common.config.as_ref())?;

    // Handle commands that don't erase anything
    let command = cli.command.unwrap_or_default();
    let TweeraserCommands::Common(ref common_cmd) = command;
    if utils::handle_common_command(common_cmd, &config).await? {
        return Ok(());
    }

    utils::validate_config(&config)?;

    let source = IdSource::from_paths(cli.erase.csv_file, cli.erase.zip_file);
    log::info!("Erasing tweets from {source}");

    let client = ErasureClient::connect(&config)
        .await
        .context("Failed to initialize erasure client")?;
    let summary = client
        .run(&source, !cli.erase.no_check)
        .await
        .context("Erasure failed")?;

    log::info!(
        "Done: erased {} tweets in {} batches",
        summary.erased,
        summary.batches
    );
    Ok(())
}
