use dialoguer::Input;

use anyhow::Result;

use crate::download::download_pack;
use crate::options::Global;
use crate::telegram_api::BotApiClient;

/// Keyword that ends the interactive loop, matched case-insensitively.
const EXIT_KEYWORD: &str = "quit";

/// Run the interactive shell: one prompt per sticker pack, until the
/// operator types the exit keyword.
pub fn shell(global: Global) -> Result<()> {
    println!(
        "packgrab {} - Telegram sticker pack downloader",
        env!("CARGO_PKG_VERSION")
    );

    let token = super::resolve_token(&global)?;
    let api = BotApiClient::new(token)?;

    loop {
        println!();

        let link: String = Input::new()
            .with_prompt(format!(
                "Enter a sticker pack link (or '{}' to exit)",
                EXIT_KEYWORD
            ))
            .interact_text()?;

        if link.eq_ignore_ascii_case(EXIT_KEYWORD) {
            break;
        }

        if let Err(err) = download_pack(&api, &link, &global.output) {
            println!("{:#}", err);
            println!("Please check the link and your bot token.");
        }
    }

    Ok(())
}
