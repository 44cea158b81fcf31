//! List command - show the sessions in a session file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use console::Style;
use latch_session::{Clock, SystemClock};
use serde::Serialize;

use super::Context;

/// Arguments for the list command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Session file to read
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Include sessions that have already expired
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
struct SessionRow {
    session_id: String,
    user_id: String,
    created_at: f64,
    expires_at: f64,
    expired: bool,
}

/// Run the list command.
pub fn run(args: ListArgs, ctx: &Context) -> Result<()> {
    let file = ctx.config.session_file(args.file.as_deref());
    let store = ctx.load_store(&file)?;
    let now = SystemClock.now();

    let mut rows: Vec<SessionRow> = store
        .sessions()
        .into_iter()
        .map(|(session_id, s)| SessionRow {
            expired: s.is_expired_at(now),
            session_id,
            user_id: s.user_id,
            created_at: s.created_at,
            expires_at: s.expires_at,
        })
        .filter(|row| args.all || !row.expired)
        .collect();
    rows.sort_by(|a, b| a.session_id.cmp(&b.session_id));

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    if rows.is_empty() {
        println!("{}", dim.apply_to("No sessions"));
        return Ok(());
    }

    let red = Style::new().red();
    for row in &rows {
        let remaining = (row.expires_at - now).max(0.0);
        let status = if row.expired {
            red.apply_to("expired".to_string())
        } else {
            dim.apply_to(format!("{:.0}s left", remaining))
        };
        println!("{}  {}  {}", row.session_id, row.user_id, status);
    }

    Ok(())
}
