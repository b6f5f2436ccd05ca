//! Image normalization: remote URL → bounded, aspect-preserving PNG.
//!
//! ## Why PNG?
//!
//! Downstream assembly then handles exactly one raster format, and lossless
//! re-encoding keeps problem text crisp — JPEG artefacts on scanned maths
//! are exactly what we do not want in a printed worksheet.
//!
//! ## Degrade, never throw
//!
//! [`fetch_prepared`] returns `Option`: any failure — network, status,
//! empty body, wrong signature, undecodable pixels, encode error — logs a
//! warning with the URL and yields `None`. The caller substitutes a
//! placeholder cell. A single bad image must not abort a whole document,
//! so no error from this module ever reaches a request handler.

use std::io::Cursor;

use image::{
    codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder},
    imageops::FilterType,
    GenericImageView, ImageFormat,
};
use reqwest::header::USER_AGENT;
use thiserror::Error;
use tracing::{debug, warn};

/// PNG 8-byte file signature.
const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// JPEG start-of-image marker.
const JPEG_MAGIC: [u8; 2] = [0xFF, 0xD8];

/// A normalized image ready to embed: always PNG, always within bounds.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Per-image size limits in pixels.
#[derive(Debug, Clone, Copy)]
pub struct ImageBounds {
    pub max_width: u32,
    pub max_height: u32,
}

#[derive(Debug, Error)]
enum PrepareError {
    #[error("request failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("http status {0}")]
    Status(reqwest::StatusCode),
    #[error("empty body")]
    EmptyBody,
    #[error("not a png or jpeg")]
    UnknownFormat,
    #[error("decode failed: {0}")]
    Decode(image::ImageError),
    #[error("png encode failed: {0}")]
    Encode(image::ImageError),
}

/// Fetch `url` and normalize it to a bounded PNG.
///
/// Returns `None` on any failure; the reason is logged with the URL.
/// Idempotent and side-effect-free beyond the fetch itself, so retrying is
/// always safe.
pub async fn fetch_prepared(
    client: &reqwest::Client,
    url: &str,
    bounds: ImageBounds,
) -> Option<PreparedImage> {
    match try_fetch_prepared(client, url, bounds).await {
        Ok(image) => Some(image),
        Err(reason) => {
            warn!("image prepare failed: {url}: {reason}");
            None
        }
    }
}

async fn try_fetch_prepared(
    client: &reqwest::Client,
    url: &str,
    bounds: ImageBounds,
) -> Result<PreparedImage, PrepareError> {
    let response = client
        .get(url)
        .header(USER_AGENT, "Mozilla/5.0")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(PrepareError::Status(status));
    }

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Err(PrepareError::EmptyBody);
    }

    let format = sniff_format(&bytes).ok_or(PrepareError::UnknownFormat)?;
    prepare_bytes(&bytes, format, bounds)
}

/// Accept exactly PNG and JPEG, by magic bytes only. Anything else —
/// including content mislabeled by the host — is rejected.
fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.len() >= PNG_MAGIC.len() && bytes[..PNG_MAGIC.len()] == PNG_MAGIC {
        Some(ImageFormat::Png)
    } else if bytes.len() >= JPEG_MAGIC.len() && bytes[..JPEG_MAGIC.len()] == JPEG_MAGIC {
        Some(ImageFormat::Jpeg)
    } else {
        None
    }
}

fn prepare_bytes(
    bytes: &[u8],
    format: ImageFormat,
    bounds: ImageBounds,
) -> Result<PreparedImage, PrepareError> {
    let decoded =
        image::load_from_memory_with_format(bytes, format).map_err(PrepareError::Decode)?;
    let (width, height) = decoded.dimensions();

    let (target_w, target_h) = fit_within(width, height, bounds);
    let resized = if (target_w, target_h) != (width, height) {
        decoded.resize_exact(target_w, target_h, FilterType::Lanczos3)
    } else {
        decoded
    };

    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(
        Cursor::new(&mut out),
        CompressionType::Best,
        PngFilterType::Adaptive,
    );
    resized.write_with_encoder(encoder).map_err(PrepareError::Encode)?;

    debug!("prepared image {width}x{height} -> {target_w}x{target_h}, {} bytes", out.len());

    Ok(PreparedImage { bytes: out, width: target_w, height: target_h })
}

/// Uniform shrink-to-fit: `scale = min(max_w/w, max_h/h, 1)`.
///
/// Never upscales; floors to whole pixels with a 1-pixel minimum so extreme
/// aspect ratios cannot collapse a dimension to zero.
fn fit_within(width: u32, height: u32, bounds: ImageBounds) -> (u32, u32) {
    let scale = (bounds.max_width as f64 / width as f64)
        .min(bounds.max_height as f64 / height as f64)
        .min(1.0);
    let w = ((width as f64 * scale).floor() as u32).max(1);
    let h = ((height as f64 * scale).floor() as u32).max(1);
    (w, h)
}
