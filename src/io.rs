// ============================================================================
// CODEC BOUNDARY - decode/encode between snapshot bytes and working bitmaps
// ============================================================================
//
// Decode and encode are the session's only suspension points. Both hop onto
// the blocking pool so a large JPEG never stalls the cooperative thread that
// owns the session.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use tokio::task::spawn_blocking;

use crate::error::EditError;
use crate::timeline::Snapshot;

/// Output container for export. Snapshots themselves always travel as PNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::WebP),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }
}

/// Decode snapshot bytes into an RGBA working bitmap.
pub async fn decode(snapshot: Snapshot) -> Result<RgbaImage, EditError> {
    let bytes = snapshot.shared_bytes();
    spawn_blocking(move || {
        image::load_from_memory(&bytes)
            .map(|img| img.to_rgba8())
            .map_err(|e| EditError::DecodeFailure(e.to_string()))
    })
    .await
    .map_err(|e| EditError::DecodeFailure(e.to_string()))?
}

/// Encode a working bitmap into the requested container.
/// `quality` applies to JPEG only (1-100); PNG and WebP are lossless.
pub async fn encode(
    image: RgbaImage,
    format: OutputFormat,
    quality: u8,
) -> Result<Vec<u8>, EditError> {
    spawn_blocking(move || encode_sync(&image, format, quality))
        .await
        .map_err(|e| EditError::EncodeFailure(e.to_string()))?
}

fn encode_sync(image: &RgbaImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>, EditError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(EditError::InvalidDimensions);
    }

    let mut out = Cursor::new(Vec::new());
    match format {
        OutputFormat::Png => {
            PngEncoder::new(&mut out)
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(|e| EditError::EncodeFailure(e.to_string()))?;
        }
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel: composite down to RGB first.
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                .map_err(|e| EditError::EncodeFailure(e.to_string()))?;
        }
        OutputFormat::WebP => {
            WebPEncoder::new_lossless(&mut out)
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(|e| EditError::EncodeFailure(e.to_string()))?;
        }
    }
    Ok(out.into_inner())
}

/// Suggested download filename: `<basename>-picraft.<ext>`.
///
/// `source_name` is the acquisition filename, if any; its extension is
/// dropped and replaced with the export container's.
pub fn suggested_filename(source_name: Option<&str>, format: OutputFormat) -> String {
    let stem = source_name
        .map(|name| {
            let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
            match base.rsplit_once('.') {
                Some((stem, _)) if !stem.is_empty() => stem,
                _ => base,
            }
        })
        .filter(|stem| !stem.is_empty())
        .unwrap_or("image");
    format!("{}-picraft.{}", stem, format.extension())
}
