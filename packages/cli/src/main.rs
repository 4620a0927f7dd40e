mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{assets, check, inspect, save, AssetsArgs, CheckArgs, InspectArgs, SaveArgs};

/// fxom - inspect, check and re-save declarative UI markup
#[derive(Parser, Debug)]
#[command(name = "fxom")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the object tree of a document
    Inspect(InspectArgs),

    /// Report unresolved classes, references and resources
    Check(CheckArgs),

    /// Write documents back with up-to-date imports and namespaces
    Save(SaveArgs),

    /// List the files documents refer to
    Assets(AssetsArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Inspect(args) => inspect(args, &cwd),
        Command::Check(args) => check(args, &cwd),
        Command::Save(args) => save(args, &cwd),
        Command::Assets(args) => assets(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
