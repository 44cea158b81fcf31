//! Issue command - create a session and print its token.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;

use super::Context;

/// Arguments for the issue command.
#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Session identifier
    #[arg(short, long)]
    pub session: String,

    /// User the session belongs to
    #[arg(short, long)]
    pub user: String,

    /// Session lifetime in seconds (default: from config)
    #[arg(long)]
    pub ttl: Option<u64>,

    /// Session file to update
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct IssueOutput<'a> {
    token: &'a str,
    session_id: &'a str,
    user_id: &'a str,
    expires_at: f64,
}

/// Run the issue command.
pub fn run(args: IssueArgs, ctx: &Context) -> Result<()> {
    let secret = ctx.require_secret()?;
    let file = ctx.config.session_file(args.file.as_deref());
    let store = ctx.load_store(&file)?;

    let ttl = args
        .ttl
        .map(Duration::from_secs)
        .unwrap_or(store.config().default_ttl);
    let token = store.create_session(&args.session, &args.user, secret, ttl);

    store
        .save_to_disk(&file)
        .with_context(|| format!("Failed to save sessions to {}", file.display()))?;

    if ctx.json_output {
        let expires_at = store
            .get(&args.session)
            .map(|s| s.expires_at)
            .unwrap_or_default();
        let output = IssueOutput {
            token: &token,
            session_id: &args.session,
            user_id: &args.user,
            expires_at,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", token);
    }

    Ok(())
}
