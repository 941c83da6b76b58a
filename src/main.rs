use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use simplelog::{Config, WriteLogger};

use viewershell::panic_handler::initialize_panic_handler;
use viewershell::replay::{Script, replay};
use viewershell::settings::Settings;

#[derive(Parser)]
#[command(name = "viewershell", version, about = "Document viewer shell driver")]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// off, error, warn, info, debug or trace
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a YAML or JSON session script and print the effects as JSON
    Replay { script: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(level) = cli.log_level {
        settings.log_level = level;
    }
    if let Some(log_file) = cli.log_file {
        settings.log_file = log_file;
    }

    WriteLogger::init(
        settings.level_filter()?,
        Config::default(),
        File::create(&settings.log_file)
            .with_context(|| format!("Failed to create log file {:?}", settings.log_file))?,
    )?;
    initialize_panic_handler();

    match cli.command {
        Command::Replay { script } => {
            info!("Replaying {script:?}");
            let parsed = Script::load(&script)
                .with_context(|| format!("Failed to read script {script:?}"))?;
            let report = replay(settings, parsed);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    info!("Shutting down viewershell");
    Ok(())
}
