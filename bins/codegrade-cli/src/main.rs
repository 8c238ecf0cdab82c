mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codegrade-cli")]
#[command(about = "Codegrade CLI - Run submissions and inspect the harness catalog", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a source file against a JSON list of test cases
    Run {
        /// Source file with the submitted solution
        #[arg(short, long)]
        file: PathBuf,

        /// Language name (python, java, javascript, cpp, apex)
        #[arg(short, long)]
        language: String,

        /// Problem identifier (e.g., two-sum)
        #[arg(short, long)]
        problem: Option<String>,

        /// JSON file holding `[{"input", "expectedOutput", "description"}]`
        #[arg(short, long)]
        tests: PathBuf,

        /// Print the raw ExecutionResponse as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// List catalog problems and the languages with a registered harness
    Problems,

    /// Run a single workspace sweep pass
    Sweep,

    /// Fail if any catalog problem lacks a harness for a language it lists
    CheckCatalog,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            language,
            problem,
            tests,
            json,
        } => {
            commands::run_submission(&file, &language, problem.as_deref(), &tests, json).await?;
        }
        Commands::Problems => {
            commands::list_problems();
        }
        Commands::Sweep => {
            commands::sweep().await?;
        }
        Commands::CheckCatalog => {
            commands::check_catalog()?;
        }
    }

    Ok(())
}
