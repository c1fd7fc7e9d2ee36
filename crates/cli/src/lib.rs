pub mod commands;

use clap::{Parser, Subcommand};
use commands::CommandResult;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "deckbot",
    about = "Deckbot operator CLI",
    long_about = "Inspect configuration, check readiness, apply migrations, and send appointment reminders.",
    after_help = "Examples:\n  deckbot doctor --json\n  deckbot config\n  deckbot remind --dry-run"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, WhatsApp credentials, LLM endpoint, DB and PDF converter")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Send reminders for appointments starting within the lookahead window")]
    Remind {
        #[arg(long, help = "List due appointments without sending or marking anything")]
        dry_run: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => CommandResult::plain(commands::config::run()),
        Command::Doctor { json } => CommandResult::plain(commands::doctor::run(json)),
        Command::Remind { dry_run } => commands::remind::run(dry_run),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
