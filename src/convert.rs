//! Re-encoding of static WEBP stickers as PNG files.

use std::path::Path;

use fs_err as fs;
use image::ImageFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("couldn't re-encode image")]
    Image {
        #[from]
        source: image::ImageError,
    },

    #[error("couldn't remove source image after conversion")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Re-encode the image at `source` as a PNG at `dest`, then delete `source`.
///
/// The source file is only removed once decoding and re-encoding have both
/// succeeded; on failure it stays on disk untouched.
pub fn webp_to_png(source: &Path, dest: &Path) -> Result<(), ConvertError> {
    let image = image::open(source)?;
    image.save_with_format(dest, ImageFormat::Png)?;

    fs::remove_file(source)?;
    Ok(())
}
