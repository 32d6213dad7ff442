//! Persistence of the Telegram bot token between sessions, stored as a small
//! JSON file next to wherever packgrab is run from.

use std::path::Path;

use fs_err as fs;
use log::debug;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use anyhow::Result;

/// On-disk shape of the config file. Only one field is recognized; anything
/// else in the file is ignored.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    bot_token: Option<String>,
}

/// Read the stored bot token. A missing file, unparsable contents, a missing
/// field, and an empty value all mean the same thing to the caller: no token
/// is stored.
pub fn load_token(path: &Path) -> Option<SecretString> {
    let contents = fs::read_to_string(path).ok()?;

    let config: ConfigFile = match serde_json::from_str(&contents) {
        Ok(config) => config,
        Err(err) => {
            debug!("Ignoring config file {}: {}", path.display(), err);
            return None;
        }
    };

    config
        .bot_token
        .filter(|token| !token.is_empty())
        .map(SecretString::new)
}

/// Write the bot token, replacing whatever the file held before.
pub fn save_token(path: &Path, token: &SecretString) -> Result<()> {
    let config = ConfigFile {
        bot_token: Some(token.expose_secret().clone()),
    };

    fs::write(path, serde_json::to_string_pretty(&config)?)?;
    Ok(())
}
