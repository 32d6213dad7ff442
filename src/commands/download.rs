use clap::Args;
use log::info;

use anyhow::Result;

use crate::download::download_pack;
use crate::options::Global;
use crate::telegram_api::BotApiClient;

#[derive(Debug, Args)]
pub struct DownloadOptions {
    /// The shareable link of the sticker pack, or just its short name.
    pub link: String,
}

pub fn download(global: Global, options: DownloadOptions) -> Result<()> {
    let token = super::resolve_token(&global)?;
    let api = BotApiClient::new(token)?;

    let report = download_pack(&api, &options.link, &global.output)?;

    info!(
        "Downloaded {} of {} stickers ({} converted, {} skipped)",
        report.downloaded, report.attempted, report.converted, report.skipped
    );

    Ok(())
}
