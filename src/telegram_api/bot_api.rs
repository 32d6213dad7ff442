//! Client for the Telegram Bot API over plain blocking HTTP.

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use fs_err as fs;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize};

use super::{RemoteFile, StickerSet, TelegramApiClient, TelegramApiError};

const BOT_API_BASE: &str = "https://api.telegram.org";
const USER_AGENT: &str = concat!("packgrab/", env!("CARGO_PKG_VERSION"));

/// Files are streamed to disk in chunks of this size.
const DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;

/// The envelope every Bot API method wraps its response in, before any
/// errors have been handled.
#[derive(Debug, Deserialize)]
struct RawResponse<T> {
    #[serde(default)]
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Shape of the `getFile` result. The API's own contract makes `file_path`
/// optional, so its absence has to be handled here.
#[derive(Debug, Deserialize)]
struct FilePayload {
    file_path: Option<String>,

    #[serde(default)]
    file_size: Option<u64>,
}

pub struct BotApiClient {
    client: reqwest::blocking::Client,
    base_url: String,
    token: SecretString,
}

impl BotApiClient {
    pub fn new(token: SecretString) -> Result<Self, TelegramApiError> {
        Self::with_base_url(token, BOT_API_BASE.to_owned())
    }

    fn with_base_url(token: SecretString, base_url: String) -> Result<Self, TelegramApiError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(http_error)?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token.expose_secret(), method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.base_url,
            self.token.expose_secret(),
            file_path
        )
    }

    /// Call a Bot API method and unwrap its response envelope.
    fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T, TelegramApiError> {
        let response = self
            .client
            .get(self.method_url(method))
            .query(params)
            .send()
            .map_err(http_error)?;

        let status = response.status();
        let body = response.text().map_err(http_error)?;

        parse_response(status, &body)
    }
}

// The URLs this client builds embed the bot token, so neither they nor the
// client itself may end up in log output.
impl fmt::Debug for BotApiClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("BotApiClient")
    }
}

impl TelegramApiClient for BotApiClient {
    fn get_sticker_set(&self, name: &str) -> Result<StickerSet, TelegramApiError> {
        self.call("getStickerSet", &[("name", name)])
    }

    fn get_file(&self, file_id: &str) -> Result<RemoteFile, TelegramApiError> {
        let payload: FilePayload = self.call("getFile", &[("file_id", file_id)])?;
        let path = payload.file_path.ok_or(TelegramApiError::MissingFilePath)?;

        Ok(RemoteFile {
            path,
            size: payload.file_size,
        })
    }

    fn download_file(
        &self,
        file_path: &str,
        dest: &Path,
        progress: &mut dyn FnMut(u64, u64),
    ) -> Result<(), TelegramApiError> {
        let response = self
            .client
            .get(self.file_url(file_path))
            .send()
            .map_err(http_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().map_err(http_error)?;
            return Err(TelegramApiError::ResponseError { status, body });
        }

        let total = response.content_length().unwrap_or(0);

        let mut reader = response;
        let mut file = fs::File::create(dest)?;
        let mut buffer = [0u8; DOWNLOAD_CHUNK_SIZE];
        let mut written = 0u64;

        loop {
            let count = reader.read(&mut buffer)?;
            if count == 0 {
                break;
            }

            file.write_all(&buffer[..count])?;
            written += count as u64;
            progress(written, total);
        }

        Ok(())
    }
}

/// reqwest attaches the request URL to its errors, and every URL this client
/// builds embeds the bot token. Strip the URL before the error can leave the
/// client and reach a console or log line.
fn http_error(source: reqwest::Error) -> TelegramApiError {
    TelegramApiError::Http {
        source: source.without_url(),
    }
}

/// Unwrap a Bot API envelope. Transport-level failures arrive through HTTP
/// status codes; API-level failures are reported inside the body with
/// `ok: false`, sometimes even under a successful status.
fn parse_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<T, TelegramApiError> {
    if !status.is_success() {
        // Most error responses still carry the JSON envelope; surface its
        // description when there is one.
        if let Ok(raw) = serde_json::from_str::<RawResponse<serde_json::Value>>(body) {
            if let Some(description) = raw.description {
                return Err(TelegramApiError::Rejected { description });
            }
        }

        return Err(TelegramApiError::ResponseError {
            status,
            body: body.to_owned(),
        });
    }

    let raw: RawResponse<T> =
        serde_json::from_str(body).map_err(|source| TelegramApiError::BadResponseJson {
            body: body.to_owned(),
            source,
        })?;

    if !raw.ok {
        let description = raw
            .description
            .unwrap_or_else(|| "no description given".to_owned());

        return Err(TelegramApiError::Rejected { description });
    }

    raw.result.ok_or(TelegramApiError::MissingResult)
}
