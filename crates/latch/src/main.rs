//! Latch - signed session tokens with an in-process session store
//!
//! Main entry point for the Latch CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

mod commands;
mod config;

use commands::{demo, derive_key, issue, list, validate};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Latch - signed session tokens with an in-process session store
#[derive(Parser)]
#[command(name = "latch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Config file (default: ./latch.toml if present)
    #[arg(short, long, global = true, env = "LATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Shared signing secret
    #[arg(long, global = true, env = "LATCH_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full issue/validate/save/load flow once
    Demo(demo::DemoArgs),

    /// Issue a token and record its session in the session file
    Issue(issue::IssueArgs),

    /// Validate a token against the session file
    Validate(validate::ValidateArgs),

    /// List sessions in the session file
    List(list::ListArgs),

    /// Derive a key from the secret with PBKDF2
    DeriveKey(derive_key::DeriveKeyArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    let config = config::load_config(cli.config.as_deref()).context("Failed to load config")?;

    let ctx = commands::Context {
        config,
        secret: cli.secret,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Demo(args) => demo::run(args, &ctx).await,
        Commands::Issue(args) => issue::run(args, &ctx),
        Commands::Validate(args) => validate::run(args, &ctx),
        Commands::List(args) => list::run(args, &ctx),
        Commands::DeriveKey(args) => derive_key::run(args, &ctx),
    }
}

/// Console logging to stderr; `RUST_LOG` overrides the default filter.
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose {
        "latch=debug,latch_session=debug,info"
    } else {
        "latch=info,latch_session=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
