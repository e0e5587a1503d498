pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "scanquote",
    about = "Scanquote operator CLI",
    long_about = "Price scoping records, inspect quote revision history, and review effective pricing configuration.",
    after_help = "Examples:\n  scanquote price intake/harborview.toml\n  scanquote history rec-harborview\n  scanquote config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true, help = "Path to scanquote.toml (defaults to the search path)")]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price a scoping record and append a new quote revision")]
    Price {
        #[arg(help = "Path to a scoping record TOML file")]
        record: PathBuf,
    },
    #[command(about = "List saved quote revisions for a scoping record, oldest first")]
    History {
        #[arg(help = "Scoping record id")]
        record_id: String,
    },
    #[command(about = "Show the effective pricing configuration after validation")]
    Config,
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Price { record } => commands::price::run(&record, cli.config.as_deref()).await,
        Command::History { record_id } => {
            commands::history::run(&record_id, cli.config.as_deref()).await
        }
        Command::Config => commands::config::run(cli.config.as_deref()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
