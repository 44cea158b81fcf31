//! Demo command - one pass through the whole session lifecycle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use console::{Style, style};
use latch_session::telemetry::events;
use latch_session::{MemoryTelemetry, SessionStore, TelemetrySnapshot};
use serde::Serialize;

use super::Context;

/// Secret used when none is configured.
const DEMO_SECRET: &str = "dev-secret";

/// Arguments for the demo command.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Session lifetime in seconds
    #[arg(long, default_value_t = 5)]
    pub ttl: u64,

    /// Session file to save to and reload from
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct DemoOutput {
    token: String,
    validated_user: Option<String>,
    file: String,
    reloaded: usize,
    telemetry: TelemetrySnapshot,
}

/// Run the demo command.
pub async fn run(args: DemoArgs, ctx: &Context) -> Result<()> {
    let secret = ctx.secret.as_deref().unwrap_or(DEMO_SECRET).as_bytes();
    let file = ctx.config.session_file(args.file.as_deref());

    let telemetry = Arc::new(MemoryTelemetry::new());
    let store = SessionStore::builder(ctx.config.store_config())
        .telemetry(telemetry.clone())
        .build();
    store.start_default_sweeper();

    let ttl = Duration::from_secs(args.ttl);
    let token = store.create_session("s1", "u123", secret, ttl);
    let validated_user = store.validate_token(&token, secret);

    store
        .save_to_disk(&file)
        .with_context(|| format!("Failed to save sessions to {}", file.display()))?;
    store
        .load_from_disk(&file)
        .with_context(|| format!("Failed to load sessions from {}", file.display()))?;
    let reloaded = store.len();

    store.shutdown().await;
    let snapshot = telemetry.snapshot();

    if ctx.json_output {
        let output = DemoOutput {
            token,
            validated_user,
            file: file.display().to_string(),
            reloaded,
            telemetry: snapshot,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let green = Style::new().green();
    let red = Style::new().red();

    println!();
    println!("{}", style("Latch Demo").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("Token:"), token);
    match &validated_user {
        Some(user) => println!("  {} {}", dim.apply_to("Validate:"), green.apply_to(user)),
        None => println!("  {} {}", dim.apply_to("Validate:"), red.apply_to("invalid")),
    }
    println!("  {} {}", dim.apply_to("Saved to:"), file.display());
    println!("  {} {} session(s)", dim.apply_to("Reloaded:"), reloaded);
    println!();
    println!(
        "  {} writes={} reads={} fails={}",
        dim.apply_to("Counters:"),
        snapshot.counter(events::COUNTER_WRITES),
        snapshot.counter(events::COUNTER_READS),
        snapshot.counter(events::COUNTER_FAILS),
    );
    if ctx.verbose {
        for event in &snapshot.events {
            println!("  {} {}", dim.apply_to("event"), event.name);
        }
    }
    println!();

    Ok(())
}
