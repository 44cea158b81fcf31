//! Derive-key command - stretch the shared secret into a fixed-size key.

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;

use super::Context;

/// Arguments for the derive-key command.
#[derive(Args, Debug)]
pub struct DeriveKeyArgs {
    /// Salt as hex (default: 16 random bytes)
    #[arg(long)]
    pub salt_hex: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeriveKeyOutput {
    salt: String,
    key: String,
}

/// Run the derive-key command.
pub fn run(args: DeriveKeyArgs, ctx: &Context) -> Result<()> {
    let secret = ctx.require_secret()?;

    let salt = match args.salt_hex {
        Some(s) => hex::decode(s.trim()).context("Salt is not valid hex")?,
        None => latch_session::random_salt().to_vec(),
    };
    let key = latch_session::derive_key(secret, &salt);

    let output = DeriveKeyOutput {
        salt: hex::encode(&salt),
        key: hex::encode(key),
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("salt {}", output.salt);
        println!("key  {}", output.key);
    }

    Ok(())
}
