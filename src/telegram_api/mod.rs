mod bot_api;

use std::path::Path;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

pub use self::bot_api::BotApiClient;

/// A sticker pack as returned by `getStickerSet`.
#[derive(Debug, Clone, Deserialize)]
pub struct StickerSet {
    pub name: String,
    pub title: String,
    pub stickers: Vec<Sticker>,
}

/// One sticker inside a pack. The Bot API sends a lot more than this; only
/// the fields the downloader needs are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct Sticker {
    pub file_id: String,
    pub file_unique_id: String,

    #[serde(default)]
    pub emoji: Option<String>,
}

/// A resolved download location for one file, valid for a short while after
/// the `getFile` call that produced it.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub path: String,
    pub size: Option<u64>,
}

pub trait TelegramApiClient {
    /// Fetch metadata for a sticker pack by its short name.
    fn get_sticker_set(&self, name: &str) -> Result<StickerSet, TelegramApiError>;

    /// Resolve a file handle into a location that can be downloaded.
    fn get_file(&self, file_id: &str) -> Result<RemoteFile, TelegramApiError>;

    /// Stream the file at `file_path` into `dest`, reporting cumulative bytes
    /// written and the expected total (0 when the server doesn't say) after
    /// each chunk.
    fn download_file(
        &self,
        file_path: &str,
        dest: &Path,
        progress: &mut dyn FnMut(u64, u64),
    ) -> Result<(), TelegramApiError>;
}

#[derive(Debug, Error)]
pub enum TelegramApiError {
    // Constructed through `bot_api::http_error`, which strips the request
    // URL: the URL embeds the bot token and must not reach log output.
    #[error("Bot API HTTP error")]
    Http {
        #[source]
        source: reqwest::Error,
    },

    #[error("Bot API rejected the request: {description}")]
    Rejected { description: String },

    #[error("Bot API returned HTTP {status} with body: {body}")]
    ResponseError { status: StatusCode, body: String },

    #[error("Bot API returned success, but had malformed JSON response: {body}")]
    BadResponseJson {
        body: String,
        source: serde_json::Error,
    },

    #[error("Bot API reported success but sent no result payload")]
    MissingResult,

    #[error("getFile response did not include a file path")]
    MissingFilePath,

    #[error("I/O error while writing a downloaded file")]
    Io {
        #[from]
        source: std::io::Error,
    },
}
