//! exforge CLI: run, self-test and inspect interactive exercises.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "exforge",
    version,
    about = "Interactive exercises with rubric self-tests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attempt exercises interactively or from an answer sheet
    Run {
        /// Only exercises whose id or tag contains one of these (comma-separated)
        #[arg(long)]
        filter: Option<String>,

        /// Grade a TOML answer sheet instead of prompting
        #[arg(long)]
        answers: Option<PathBuf>,

        /// Seed for generated reference inputs
        #[arg(long)]
        seed: Option<u64>,

        /// Malformed inputs accepted per field
        #[arg(long)]
        retry_cap: Option<u32>,

        /// Show reference inputs in each summary
        #[arg(long)]
        debug: bool,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Save each record as JSON (defaults to the configured output_dir)
        #[arg(long, num_args = 0..=1)]
        output: Option<Option<PathBuf>>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run the rubric self-tests of every exercise
    Test {
        /// Only exercises whose id or tag contains one of these (comma-separated)
        #[arg(long)]
        filter: Option<String>,

        /// Seed for generated reference inputs
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Check exercise definitions and, optionally, an answer sheet
    Validate {
        #[arg(long)]
        filter: Option<String>,

        /// Answer sheet to check against the catalog
        #[arg(long)]
        answers: Option<PathBuf>,
    },

    /// List available exercises
    List {
        #[arg(long)]
        filter: Option<String>,
    },

    /// Create starter config and example answer sheet
    Init,
}

#[tokio::main]
async fn main() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "exforge=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            filter,
            answers,
            seed,
            retry_cap,
            debug,
            format,
            output,
            config,
        } => {
            commands::run::execute(
                filter, answers, seed, retry_cap, debug, format, output, config,
            )
            .await
        }
        Commands::Test { filter, seed } => commands::test::execute(filter, seed),
        Commands::Validate { filter, answers } => commands::validate::execute(filter, answers),
        Commands::List { filter } => commands::list::execute(filter),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
