//! Validate command - check a token against the session file.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use serde::Serialize;

use super::Context;

/// Arguments for the validate command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Token to check
    pub token: String,

    /// Session file to check against
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ValidateOutput {
    valid: bool,
    user_id: Option<String>,
}

/// Run the validate command. Exits non-zero for a rejected token.
pub fn run(args: ValidateArgs, ctx: &Context) -> Result<()> {
    let secret = ctx.require_secret()?;
    let file = ctx.config.session_file(args.file.as_deref());
    let store = ctx.load_store(&file)?;

    let user_id = store.validate_token(&args.token, secret);

    if ctx.json_output {
        let output = ValidateOutput {
            valid: user_id.is_some(),
            user_id: user_id.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if let Some(user) = &user_id {
        println!("{}", user);
    }

    if user_id.is_none() {
        bail!("invalid token");
    }
    Ok(())
}
