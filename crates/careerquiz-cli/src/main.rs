//! careerquiz CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "careerquiz", version, about = "Timed skill-assessment quizzes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a quiz interactively
    Play {
        /// Path to a question bank .toml file
        #[arg(long, required_unless_present = "generate")]
        bank: Option<PathBuf>,

        /// Generate a fresh bank per attempt on this topic instead of loading one
        #[arg(long, conflicts_with = "bank")]
        generate: Option<String>,

        /// Questions per attempt: drawn at random from --bank, or generated (default 5)
        #[arg(long)]
        count: Option<usize>,

        /// Disable the per-question countdown
        #[arg(long)]
        no_timer: bool,

        /// Seconds per question
        #[arg(long)]
        time_limit: Option<u32>,

        /// Reshuffle questions and options on every attempt
        #[arg(long)]
        shuffle: bool,

        /// Write the final result as JSON to this file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Provider used with --generate
        #[arg(long)]
        provider: Option<String>,

        /// Model used with --generate
        #[arg(long)]
        model: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate question bank TOML files
    Validate {
        /// Path to bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// List the skill tests in a bank directory
    Tests {
        /// Directory of question bank files (defaults to quiz.bank_dir)
        #[arg(long)]
        bank_dir: Option<PathBuf>,

        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Ask the career assistant a question
    Advise {
        /// The question to ask
        prompt: String,

        /// Provider name from the config (or "offline")
        #[arg(long)]
        provider: Option<String>,

        /// Model to use
        #[arg(long)]
        model: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and an example question bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("careerquiz=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Play {
            bank,
            generate,
            count,
            no_timer,
            time_limit,
            shuffle,
            export,
            provider,
            model,
            config,
        } => {
            commands::play::execute(commands::play::PlayOptions {
                bank,
                generate,
                count,
                no_timer,
                time_limit,
                shuffle,
                export,
                provider,
                model,
                config,
            })
            .await
        }
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Tests {
            bank_dir,
            json,
            config,
        } => commands::catalog::execute(bank_dir, json, config),
        Commands::Advise {
            prompt,
            provider,
            model,
            config,
        } => commands::advise::execute(prompt, provider, model, config).await,
        Commands::ListModels { provider, config } => {
            commands::list_models::execute(provider, config)
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
