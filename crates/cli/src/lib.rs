pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "deskbot",
    about = "Deskbot operator CLI",
    long_about = "Inspect Deskbot configuration, check adapter readiness, and exercise the routing pipeline.",
    after_help = "Examples:\n  deskbot doctor --json\n  deskbot config\n  deskbot match \"what are your opening hours\"\n  deskbot ask \"can I change my delivery address?\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, knowledge base loading, and model and mail readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Look up the best FAQ match for a query and report the routing branch")]
    Match {
        #[arg(help = "Customer question to match against the knowledge base")]
        query: String,
    },
    #[command(about = "Route one message through the full pipeline and print the decision")]
    Ask {
        #[arg(help = "Customer message to route")]
        message: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Match { query } => commands::match_query::run(&query),
        Command::Ask { message } => commands::ask::run(&message),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
