//! quizroom CLI: run and inspect live classroom test sessions.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "quizroom", version, about = "Live classroom test sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a live session with simulated learners
    Simulate {
        /// Path to .toml question bank or directory
        #[arg(long)]
        bank: PathBuf,

        /// Number of simulated learners (default from config)
        #[arg(long)]
        learners: Option<usize>,

        /// Questions in the test (default from config)
        #[arg(long)]
        questions: Option<u32>,

        /// Output directory for the session report
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate question bank TOML files
    Validate {
        /// Path to question bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Print a saved session report
    Show {
        /// Session report JSON
        #[arg(long)]
        report: PathBuf,

        /// Print the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Create starter config and example question bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quizroom=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate {
            bank,
            learners,
            questions,
            output,
            config,
        } => commands::simulate::execute(bank, learners, questions, output, config).await,
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Show { report, json } => commands::show::execute(report, json),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
