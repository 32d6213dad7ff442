use std::path::PathBuf;

use crate::commands::Command;
use clap::Parser;
use secrecy::SecretString;

#[derive(Debug, Parser)]
#[clap(about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Options {
    #[command(flatten)]
    pub global: Global,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Parser)]
pub struct Global {
    /// The bot token for packgrab to use. If not specified, packgrab uses the
    /// token stored in its config file, or asks for one and stores it there.
    #[clap(long, global(true), env("PACKGRAB_BOT_TOKEN"), hide_env_values(true))]
    pub token: Option<SecretString>,

    /// The directory sticker packs are saved under.
    #[clap(long, global(true), default_value = "stickers")]
    pub output: PathBuf,

    /// The path of the config file holding the saved bot token.
    #[clap(long, global(true), default_value = "config.json")]
    pub config: PathBuf,

    /// Sets verbosity level. Can be specified multiple times to increase the verbosity
    /// of this program.
    #[clap(long = "verbose", short, global(true), action(clap::ArgAction::Count))]
    pub verbosity: u8,
}
