//! Image decoding
//!
//! Resolves an [`ImageRef`] to encoded bytes and rasterizes them to RGB8.
//! Every failure here is reported as [`VisionError::ImageDecode`] so callers
//! can tell a bad photo apart from an unavailable detector.

use crate::config::VisionConfig;
use crate::error::VisionError;
use base64::{engine::general_purpose, Engine as _};
use image::io::{Limits, Reader};
use image::RgbImage;
use std::io::Cursor;
use tasklens_core::ImageRef;
use tracing::debug;

/// Decoded RGB pixels ready for inference
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbImage,
}

impl DecodedImage {
    pub fn new(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Decode an image reference into pixels
pub async fn decode_image(
    image: &ImageRef,
    config: &VisionConfig,
) -> Result<DecodedImage, VisionError> {
    let bytes = load_bytes(image, config.max_image_bytes).await?;
    let max_pixels = config.max_image_pixels;
    let decoded = tokio::task::spawn_blocking(move || decode_bytes(&bytes, max_pixels))
        .await
        .map_err(|e| VisionError::ImageDecode(format!("Decode task failed: {}", e)))??;
    debug!(
        "Decoded {} into {}x{} pixels",
        image.describe(),
        decoded.width(),
        decoded.height()
    );
    Ok(decoded)
}

async fn load_bytes(image: &ImageRef, max_bytes: usize) -> Result<Vec<u8>, VisionError> {
    let bytes = match image {
        ImageRef::DataUrl(url) => parse_data_url(url)?.1,
        ImageRef::Path(path) => {
            let metadata = tokio::fs::metadata(path).await.map_err(|e| {
                VisionError::ImageDecode(format!("Cannot read {}: {}", path.display(), e))
            })?;
            if metadata.len() > max_bytes as u64 {
                return Err(too_large(metadata.len() as usize, max_bytes));
            }
            tokio::fs::read(path).await.map_err(|e| {
                VisionError::ImageDecode(format!("Cannot read {}: {}", path.display(), e))
            })?
        }
        ImageRef::Bytes(bytes) => bytes.clone(),
    };

    if bytes.is_empty() {
        return Err(VisionError::ImageDecode("Image data is empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(too_large(bytes.len(), max_bytes));
    }
    Ok(bytes)
}

fn too_large(len: usize, max: usize) -> VisionError {
    VisionError::ImageDecode(format!("Image too large: {} bytes (max {} bytes)", len, max))
}

/// Split a base64 `data:` URL into its MIME type and decoded payload
pub fn parse_data_url(url: &str) -> Result<(String, Vec<u8>), VisionError> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| VisionError::ImageDecode("Not a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| VisionError::ImageDecode("Data URL has no payload".to_string()))?;

    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| VisionError::ImageDecode("Only base64 data URLs are supported".to_string()))?;
    if !mime.is_empty() && !mime.starts_with("image/") {
        return Err(VisionError::ImageDecode(format!(
            "Data URL is not an image: {}",
            mime
        )));
    }

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| VisionError::ImageDecode(format!("Invalid base64 payload: {}", e)))?;
    Ok((mime.to_string(), bytes))
}

/// Decode encoded bytes, refusing images larger than `max_pixels`
pub fn decode_bytes(bytes: &[u8], max_pixels: u64) -> Result<DecodedImage, VisionError> {
    let mut reader = Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| VisionError::ImageDecode(e.to_string()))?;
    if reader.format().is_none() {
        return Err(VisionError::ImageDecode("Unrecognized image format".to_string()));
    }

    // Up to 16-bit RGBA before conversion to RGB8
    let mut limits = Limits::default();
    limits.max_alloc = Some(max_pixels.saturating_mul(8));
    reader.limits(limits);

    let image = reader
        .decode()
        .map_err(|e| VisionError::ImageDecode(e.to_string()))?;

    let pixels = u64::from(image.width()) * u64::from(image.height());
    if pixels == 0 {
        return Err(VisionError::ImageDecode("Image has no pixels".to_string()));
    }
    if pixels > max_pixels {
        return Err(VisionError::ImageDecode(format!(
            "Image too large: {} pixels (max {})",
            pixels, max_pixels
        )));
    }

    Ok(DecodedImage::new(image.to_rgb8()))
}
