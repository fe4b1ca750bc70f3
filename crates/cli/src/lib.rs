pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "barista",
    about = "ShopEase ordering assistant CLI",
    long_about = "Chat with the ShopEase ordering assistant, inspect effective configuration, and validate runtime readiness.",
    after_help = "Examples:\n  barista chat\n  barista config\n  barista doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive ordering conversation on stdin/stdout")]
    Chat {
        #[arg(long, value_name = "PATH", help = "Path to a barista.toml config file")]
        config: Option<PathBuf>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config {
        #[arg(long, value_name = "PATH", help = "Path to a barista.toml config file")]
        config: Option<PathBuf>,
    },
    #[command(about = "Validate config, Gemini credential readiness, and reference data files")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
        #[arg(long, value_name = "PATH", help = "Path to a barista.toml config file")]
        config: Option<PathBuf>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { config } => commands::chat::run(config.as_deref()),
        Command::Config { config } => commands::CommandResult {
            exit_code: 0,
            output: commands::config::run(config.as_deref()),
        },
        Command::Doctor { json, config } => commands::CommandResult {
            exit_code: 0,
            output: commands::doctor::run(json, config.as_deref()),
        },
    };

    // Chat manages its own stdout; other commands return their rendering.
    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
