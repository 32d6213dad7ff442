mod download;
mod shell;

use anyhow::Result;
use clap::Subcommand;
use dialoguer::Password;
use log::debug;
use secrecy::SecretString;

pub use download::*;
pub use shell::*;

use crate::config;
use crate::options::Global;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download a single sticker pack and exit. Without a subcommand,
    /// packgrab starts its interactive shell instead.
    Download(DownloadOptions),
}

/// Resolve the bot token for this run. An explicit --token or environment
/// override wins, then the config file; as a last resort the operator is
/// asked for one, and the answer is stored for future sessions.
pub fn resolve_token(global: &Global) -> Result<SecretString> {
    if let Some(token) = &global.token {
        debug!("Using bot token from the command line or environment");
        return Ok(token.clone());
    }

    if let Some(token) = config::load_token(&global.config) {
        println!("Saved bot token loaded.");
        return Ok(token);
    }

    println!("No saved bot token found.");
    let token = SecretString::new(
        Password::new()
            .with_prompt("Enter your Telegram bot token")
            .interact()?,
    );

    config::save_token(&global.config, &token)?;
    println!("Bot token saved for future sessions.");

    Ok(token)
}
