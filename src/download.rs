//! Downloads whole sticker packs: resolves the pack, streams every sticker
//! to disk, and re-encodes the static WEBP ones as PNG.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use fs_err as fs;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, warn};

use crate::convert;
use crate::telegram_api::{RemoteFile, Sticker, TelegramApiClient, TelegramApiError};

const WEBP_EXTENSION: &str = ".webp";

/// Stands in for the emoji part of a filename when a sticker carries no
/// emoji annotation at all.
const EMOJI_PLACEHOLDER: &str = "sticker";

/// Counters for a single pack run. The console says the same thing no matter
/// how many items were skipped; this is the machine-visible record of what
/// actually happened.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackReport {
    pub title: String,
    pub attempted: usize,
    pub downloaded: usize,
    pub converted: usize,
    pub skipped: usize,
}

/// Download every sticker in the pack behind `link` into a directory named
/// after the pack under `output_root`.
///
/// Individual stickers that can't be resolved or downloaded are logged and
/// skipped; only a failure to fetch the pack itself is an error.
pub fn download_pack(
    api: &impl TelegramApiClient,
    link: &str,
    output_root: &Path,
) -> Result<PackReport> {
    let pack_name = pack_name_from_link(link);

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Fetching sticker pack info...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let fetched = api.get_sticker_set(pack_name);
    spinner.finish_and_clear();

    let set =
        fetched.with_context(|| format!("Could not retrieve sticker pack '{}'", pack_name))?;
    debug!("Resolved pack '{}' with {} stickers", set.name, set.stickers.len());

    let pack_dir = output_root.join(pack_name);
    fs::create_dir_all(&pack_dir)?;

    println!("Downloading sticker pack: {}", set.title);

    let total = set.stickers.len() as u64;
    let progress = MultiProgress::new();
    let download_bar = count_bar(&progress, "Downloading", total);
    let convert_bar = count_bar(&progress, "Converting", total);

    let mut report = PackReport {
        title: set.title.clone(),
        ..PackReport::default()
    };

    for sticker in &set.stickers {
        report.attempted += 1;

        match api.get_file(&sticker.file_id) {
            Ok(remote) => {
                let extension = file_extension(&remote.path);
                let file_name = output_file_name(sticker, extension);
                let dest = pack_dir.join(&file_name);

                match fetch_to_disk(api, &remote, &dest, &progress, &file_name) {
                    Ok(()) => report.downloaded += 1,
                    Err(err) => {
                        progress.suspend(|| warn!("Failed to download {}: {}", file_name, err));
                    }
                }

                if extension.eq_ignore_ascii_case(WEBP_EXTENSION) {
                    match convert::webp_to_png(&dest, &dest.with_extension("png")) {
                        Ok(()) => report.converted += 1,
                        Err(err) => {
                            progress.suspend(|| warn!("Failed to convert {}: {}", file_name, err));
                        }
                    }
                }

                convert_bar.inc(1);
            }
            Err(err) => {
                report.skipped += 1;
                progress.suspend(|| warn!("Skipping sticker {}: {}", sticker.file_unique_id, err));
            }
        }

        download_bar.inc(1);
    }

    download_bar.finish();
    convert_bar.abandon();

    println!("Sticker pack download complete!");
    debug!(
        "Pack '{}': {} attempted, {} downloaded, {} converted, {} skipped",
        report.title, report.attempted, report.downloaded, report.converted, report.skipped
    );

    Ok(report)
}

/// Stream one file to disk behind a transient byte-level bar.
fn fetch_to_disk(
    api: &impl TelegramApiClient,
    remote: &RemoteFile,
    dest: &Path,
    progress: &MultiProgress,
    file_name: &str,
) -> Result<(), TelegramApiError> {
    let bar = progress.add(ProgressBar::new(remote.size.unwrap_or(0)));
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
        )
        .unwrap()
        .progress_chars("█▓░"),
    );
    bar.set_message(file_name.to_owned());

    let result = api.download_file(&remote.path, dest, &mut |written, total| {
        if total != 0 && bar.length() != Some(total) {
            bar.set_length(total);
        }
        bar.set_position(written);
    });

    bar.finish_and_clear();
    progress.remove(&bar);

    result
}

fn count_bar(progress: &MultiProgress, prefix: &'static str, total: u64) -> ProgressBar {
    let bar = progress.add(ProgressBar::new(total));
    bar.set_style(
        ProgressStyle::with_template("{prefix:>12.cyan.bold} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("█▓░"),
    );
    bar.set_prefix(prefix);
    bar
}

/// A shareable pack link carries the pack's short name as its final path
/// segment. No validation happens here; a malformed link just produces a
/// name the Bot API will reject.
fn pack_name_from_link(link: &str) -> &str {
    link.rsplit('/').next().unwrap_or(link)
}

/// Keep only the alphanumeric characters of an emoji annotation. A sticker
/// with no annotation gets a fixed placeholder instead, so the filename
/// still has a stem.
fn sanitize_emoji(emoji: Option<&str>) -> String {
    emoji
        .filter(|emoji| !emoji.is_empty())
        .unwrap_or(EMOJI_PLACEHOLDER)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Extension of a remote path's file name, leading dot included, or an empty
/// string when it has none.
fn file_extension(remote_path: &str) -> &str {
    let name = remote_path.rsplit('/').next().unwrap_or(remote_path);

    match name.rfind('.') {
        Some(position) if position > 0 => &name[position..],
        _ => "",
    }
}

/// `<file_unique_id>_<sanitized emoji><extension>`. The unique id prefix
/// keeps names collision-free even when stickers share an emoji.
fn output_file_name(sticker: &Sticker, extension: &str) -> String {
    format!(
        "{}_{}{}",
        sticker.file_unique_id,
        sanitize_emoji(sticker.emoji.as_deref()),
        extension
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use image::codecs::webp::WebPEncoder;
    use image::{ColorType, Rgba, RgbaImage};
    use reqwest::StatusCode;

    use super::*;
    use crate::telegram_api::StickerSet;

    /// Canned stand-in for the Bot API: maps file ids to remote paths and
    /// remote paths to bytes, with optional per-id and per-path failures.
    #[derive(Default)]
    struct FakeApi {
        set: Option<StickerSet>,
        files: HashMap<String, String>,
        contents: HashMap<String, Vec<u8>>,
        broken_handles: Vec<String>,
        broken_paths: Vec<String>,
    }

    impl TelegramApiClient for FakeApi {
        fn get_sticker_set(&self, _name: &str) -> Result<StickerSet, TelegramApiError> {
            self.set.clone().ok_or(TelegramApiError::Rejected {
                description: "STICKERSET_INVALID".to_owned(),
            })
        }

        fn get_file(&self, file_id: &str) -> Result<RemoteFile, TelegramApiError> {
            if self.broken_handles.iter().any(|id| id == file_id) {
                return Err(TelegramApiError::Rejected {
                    description: "wrong file_id specified".to_owned(),
                });
            }

            let path = self
                .files
                .get(file_id)
                .cloned()
                .ok_or(TelegramApiError::MissingFilePath)?;
            let size = self.contents.get(&path).map(|bytes| bytes.len() as u64);

            Ok(RemoteFile { path, size })
        }

        fn download_file(
            &self,
            file_path: &str,
            dest: &Path,
            progress: &mut dyn FnMut(u64, u64),
        ) -> Result<(), TelegramApiError> {
            if self.broken_paths.iter().any(|path| path == file_path) {
                return Err(TelegramApiError::ResponseError {
                    status: StatusCode::BAD_GATEWAY,
                    body: "upstream went away".to_owned(),
                });
            }

            let bytes = &self.contents[file_path];
            fs::write(dest, bytes)?;
            progress(bytes.len() as u64, bytes.len() as u64);

            Ok(())
        }
    }

    fn sticker(file_id: &str, unique_id: &str, emoji: Option<&str>) -> Sticker {
        Sticker {
            file_id: file_id.to_owned(),
            file_unique_id: unique_id.to_owned(),
            emoji: emoji.map(str::to_owned),
        }
    }

    fn webp_bytes() -> Vec<u8> {
        let image = RgbaImage::from_pixel(8, 8, Rgba([255, 200, 0, 255]));
        let mut buffer = Vec::new();

        WebPEncoder::new_lossless(&mut buffer)
            .encode(image.as_raw(), 8, 8, ColorType::Rgba8)
            .unwrap();

        buffer
    }

    fn utya_api() -> FakeApi {
        let mut api = FakeApi::default();
        api.set = Some(StickerSet {
            name: "UtyaTheDuck".to_owned(),
            title: "Utya The Duck".to_owned(),
            stickers: vec![
                sticker("fid-a", "AAA", Some("🦆")),
                sticker("fid-b", "BBB", Some("")),
            ],
        });
        api.files
            .insert("fid-a".to_owned(), "stickers/file_0.webp".to_owned());
        api.files
            .insert("fid-b".to_owned(), "stickers/file_1.tgs".to_owned());
        api.contents
            .insert("stickers/file_0.webp".to_owned(), webp_bytes());
        api.contents
            .insert("stickers/file_1.tgs".to_owned(), b"animated bytes".to_vec());
        api
    }

    #[test]
    fn downloads_a_mixed_pack() {
        let dir = tempfile::tempdir().unwrap();
        let api = utya_api();

        let report =
            download_pack(&api, "https://t.me/addstickers/UtyaTheDuck", dir.path()).unwrap();

        let pack_dir = dir.path().join("UtyaTheDuck");
        assert!(pack_dir.join("AAA_.png").exists());
        assert!(
            !pack_dir.join("AAA_.webp").exists(),
            "converted source should be removed"
        );
        assert!(pack_dir.join("BBB_sticker.tgs").exists());

        assert_eq!(
            report,
            PackReport {
                title: "Utya The Duck".to_owned(),
                attempted: 2,
                downloaded: 2,
                converted: 1,
                skipped: 0,
            }
        );
    }

    #[test]
    fn failed_pack_lookup_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let api = FakeApi::default();

        let result = download_pack(&api, "https://t.me/addstickers/Gone", dir.path());

        assert!(result.is_err());
        assert!(!dir.path().join("Gone").exists());
    }

    #[test]
    fn one_bad_sticker_does_not_stop_the_pack() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = FakeApi::default();
        api.set = Some(StickerSet {
            name: "Pack".to_owned(),
            title: "Pack".to_owned(),
            stickers: vec![
                sticker("fid-1", "AAA", Some("😀")),
                sticker("fid-2", "BBB", Some("😀")),
                sticker("fid-3", "CCC", Some("😀")),
            ],
        });
        api.files.insert("fid-1".to_owned(), "a.webp".to_owned());
        api.files.insert("fid-3".to_owned(), "c.tgs".to_owned());
        api.contents.insert("a.webp".to_owned(), webp_bytes());
        api.contents.insert("c.tgs".to_owned(), b"ccc".to_vec());
        api.broken_handles.push("fid-2".to_owned());

        let report = download_pack(&api, "Pack", dir.path()).unwrap();

        let pack_dir = dir.path().join("Pack");
        assert!(pack_dir.join("AAA_.png").exists());
        assert!(!pack_dir.join("BBB_.tgs").exists());
        assert!(pack_dir.join("CCC_.tgs").exists());

        assert_eq!(report.attempted, 3);
        assert_eq!(report.downloaded, 2);
        assert_eq!(report.converted, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn failed_download_is_logged_but_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = FakeApi::default();
        api.set = Some(StickerSet {
            name: "Pack".to_owned(),
            title: "Pack".to_owned(),
            stickers: vec![
                sticker("fid-1", "AAA", Some("🦆")),
                sticker("fid-2", "BBB", Some("🦆")),
            ],
        });
        api.files.insert("fid-1".to_owned(), "a.webp".to_owned());
        api.files.insert("fid-2".to_owned(), "b.tgs".to_owned());
        api.contents.insert("a.webp".to_owned(), webp_bytes());
        api.contents.insert("b.tgs".to_owned(), b"bbb".to_vec());
        api.broken_paths.push("a.webp".to_owned());

        let report = download_pack(&api, "Pack", dir.path()).unwrap();

        // The first sticker never made it to disk, so its conversion failed
        // too; the second downloaded fine.
        assert_eq!(report.attempted, 2);
        assert_eq!(report.downloaded, 1);
        assert_eq!(report.converted, 0);
        assert_eq!(report.skipped, 0);
        assert!(dir.path().join("Pack").join("BBB_.tgs").exists());
    }

    #[test]
    fn rerunning_a_pack_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let api = utya_api();

        download_pack(&api, "UtyaTheDuck", dir.path()).unwrap();
        let report = download_pack(&api, "UtyaTheDuck", dir.path()).unwrap();

        assert_eq!(report.downloaded, 2);
        assert!(dir.path().join("UtyaTheDuck").join("AAA_.png").exists());
    }

    #[test]
    fn sanitizes_emoji_annotations() {
        assert_eq!(sanitize_emoji(Some("🦆")), "");
        assert_eq!(sanitize_emoji(Some("a🦆b2")), "ab2");
        assert_eq!(sanitize_emoji(None), "sticker");
        assert_eq!(sanitize_emoji(Some("")), "sticker");
    }

    #[test]
    fn extracts_pack_names_from_links() {
        assert_eq!(
            pack_name_from_link("https://t.me/addstickers/UtyaTheDuck"),
            "UtyaTheDuck"
        );
        assert_eq!(pack_name_from_link("UtyaTheDuck"), "UtyaTheDuck");
    }

    #[test]
    fn extracts_extensions_from_remote_paths() {
        assert_eq!(file_extension("stickers/file_123.webp"), ".webp");
        assert_eq!(file_extension("stickers/file_9.TGS"), ".TGS");
        assert_eq!(file_extension("stickers/archive.tar.gz"), ".gz");
        assert_eq!(file_extension("stickers/noext"), "");
        assert_eq!(file_extension("dir.v2/noext"), "");
        assert_eq!(file_extension(".hidden"), "");
    }

    #[test]
    fn unique_ids_keep_names_distinct() {
        let a = sticker("fid-1", "AAA", Some("😀"));
        let b = sticker("fid-2", "BBB", Some("😀"));

        assert_ne!(output_file_name(&a, ".webp"), output_file_name(&b, ".webp"));
    }
}
