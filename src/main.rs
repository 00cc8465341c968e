//! # Trim Advisor CLI (`advisor`)
//!
//! ## Usage
//!
//! ```bash
//! advisor --config ./config/advisor.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `advisor recommend` | Run the pipeline once and print the result as JSON |
//! | `advisor check` | Validate config and catalog files (no network) |
//! | `advisor index build` | Precompute trim embeddings from the docs file |
//! | `advisor serve` | Start the HTTP server |
//!
//! Logs go to stderr (`RUST_LOG` overrides the default `trim_advisor=info`),
//! so stdout carries only command output.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use trim_advisor::catalog::load_catalog;
use trim_advisor::config;
use trim_advisor::error::AdvisorError;
use trim_advisor::models::ShopperAnswers;
use trim_advisor::pipeline::{Advisor, CancelToken};
use trim_advisor::{check, embed_cmd, server};

/// Trim Advisor: grounded vehicle-trim recommendations from free-text
/// shopper preferences.
#[derive(Parser)]
#[command(
    name = "advisor",
    about = "Trim Advisor: grounded vehicle-trim recommendations from free-text preferences",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/advisor.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the recommendation pipeline once.
    ///
    /// Prints `{profile, candidates, result}` as JSON. Exits with status 2
    /// when no trim satisfies the must-haves and 1 on any other failure.
    Recommend {
        /// What the vehicle is for (e.g. "family and weekend road trips").
        #[arg(long, default_value = "")]
        purpose: String,

        /// Where it will be driven.
        #[arg(long, default_value = "")]
        location: String,

        /// Preferred look and feel.
        #[arg(long, default_value = "")]
        appearance: String,

        /// Wanted features, free text.
        #[arg(long, default_value = "")]
        features: String,

        /// Budget, free text (e.g. "around 40k").
        #[arg(long, default_value = "")]
        budget: String,

        /// Read all five answers from a JSON file instead of flags.
        #[arg(long, conflicts_with_all = ["purpose", "location", "appearance", "features", "budget"])]
        answers: Option<PathBuf>,
    },

    /// Validate configuration and catalog files.
    Check,

    /// Manage the trim embedding index.
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum IndexAction {
    /// Embed every trim document and write the vectors file.
    Build {
        /// Show document counts without calling the embedding service.
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trim_advisor=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Recommend {
            purpose,
            location,
            appearance,
            features,
            budget,
            answers,
        } => {
            let answers = match answers {
                Some(path) => {
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse {}", path.display()))?
                }
                None => ShopperAnswers {
                    purpose,
                    location,
                    appearance,
                    features,
                    budget,
                },
            };

            let catalog = Arc::new(load_catalog(&cfg)?);
            let advisor = Advisor::from_config(&cfg, catalog)?;

            match advisor.recommend(&answers, &CancelToken::new()).await {
                Ok(rec) => println!("{}", serde_json::to_string_pretty(&rec)?),
                Err(e) => {
                    report_failure(&e);
                    let status = match e {
                        AdvisorError::EmptyCandidates { .. } => 2,
                        _ => 1,
                    };
                    std::process::exit(status);
                }
            }
        }
        Commands::Check => {
            check::run_check(&cfg)?;
        }
        Commands::Index { action } => match action {
            IndexAction::Build { dry_run } => {
                embed_cmd::run_index_build(&cfg, dry_run).await?;
            }
        },
        Commands::Serve => {
            let catalog = Arc::new(load_catalog(&cfg)?);
            let advisor = Arc::new(Advisor::from_config(&cfg, catalog)?);
            server::run_server(&cfg.server.bind, advisor).await?;
        }
    }

    Ok(())
}

fn report_failure(e: &AdvisorError) {
    eprintln!("error [{}]: {}", e.code(), e);
    if let Some(raw) = e.raw_output() {
        eprintln!("raw model output:\n{}", raw);
    }
}
