//! Proof image references
//!
//! An [`ImageRef`] is an opaque handle to encoded image data. Tasks own one per
//! proof photo; the analysis engine resolves it to pixels.

use crate::{Error, Result};
use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Largest photo accepted for embedding into the task file
pub const MAX_EMBED_BYTES: usize = 16 * 1024 * 1024;

/// Encoded image data, inline or on disk
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ImageRef {
    /// `data:<mime>;base64,<payload>` URL
    DataUrl(String),
    /// Image file on local disk
    Path(PathBuf),
    /// Encoded bytes held in memory
    Bytes(Vec<u8>),
}

impl ImageRef {
    /// Read an image file and embed it as a data URL.
    ///
    /// The format is sniffed from the file contents so that the stored MIME type
    /// matches the payload regardless of the file extension.
    pub fn embed_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        if bytes.len() > MAX_EMBED_BYTES {
            return Err(Error::InvalidImage(format!(
                "{} is too large to embed ({} bytes, max {} bytes)",
                path.display(),
                bytes.len(),
                MAX_EMBED_BYTES
            )));
        }
        Self::data_url_from_bytes(&bytes)
    }

    /// Reference an image file without copying it.
    ///
    /// The stored path is absolute, so the reference stays valid from any
    /// working directory.
    pub fn link_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::InvalidImage(format!("{} is not a file", path.display())));
        }
        let absolute = fs::canonicalize(path).map_err(|e| {
            Error::InvalidImage(format!("Cannot resolve {}: {}", path.display(), e))
        })?;
        Ok(ImageRef::Path(absolute))
    }

    /// Build a data URL from encoded image bytes
    pub fn data_url_from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidImage("image data is empty".to_string()));
        }
        let format = image::guess_format(bytes)
            .map_err(|e| Error::InvalidImage(format!("unrecognized image data: {}", e)))?;
        let payload = general_purpose::STANDARD.encode(bytes);
        Ok(ImageRef::DataUrl(format!("data:{};base64,{}", mime_type(format), payload)))
    }

    pub fn is_inline(&self) -> bool {
        !matches!(self, ImageRef::Path(_))
    }

    /// Short human-readable description for logs and listings
    pub fn describe(&self) -> String {
        match self {
            ImageRef::DataUrl(url) => {
                let mime = url
                    .strip_prefix("data:")
                    .and_then(|rest| rest.split(|c: char| c == ';' || c == ',').next())
                    .filter(|m| !m.is_empty())
                    .unwrap_or("unknown");
                format!("embedded {} ({} bytes)", mime, url.len())
            }
            ImageRef::Path(path) => format!("file {}", path.display()),
            ImageRef::Bytes(bytes) => format!("in-memory image ({} bytes)", bytes.len()),
        }
    }
}

// Data URLs can be megabytes long; keep Debug output readable.
impl fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageRef({})", self.describe())
    }
}

fn mime_type(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Ico => "image/x-icon",
        ImageFormat::Avif => "image/avif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_data_url_from_png_bytes() {
        let image = ImageRef::data_url_from_bytes(PNG_MAGIC).unwrap();
        match image {
            ImageRef::DataUrl(url) => assert!(url.starts_with("data:image/png;base64,")),
            other => panic!("Expected data URL, got {:?}", other),
        }
    }

    #[test]
    fn test_data_url_rejects_unknown_bytes() {
        assert!(ImageRef::data_url_from_bytes(b"plain text, not an image").is_err());
        assert!(ImageRef::data_url_from_bytes(&[]).is_err());
    }

    #[test]
    fn test_embed_and_link_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PNG_MAGIC).unwrap();

        let embedded = ImageRef::embed_file(file.path()).unwrap();
        assert!(embedded.is_inline());
        assert!(embedded.describe().starts_with("embedded image/png"));

        let linked = ImageRef::link_file(file.path()).unwrap();
        assert!(!linked.is_inline());
        assert_eq!(linked, ImageRef::Path(file.path().canonicalize().unwrap()));
    }

    #[test]
    fn test_link_missing_file() {
        assert!(ImageRef::link_file("/nonexistent/photo.jpg").is_err());
    }

    #[test]
    fn test_serde_tagging() {
        let image = ImageRef::DataUrl("data:image/png;base64,AAAA".to_string());
        let json = serde_json::to_string(&image).unwrap();
        assert_eq!(json, r#"{"kind":"data_url","value":"data:image/png;base64,AAAA"}"#);
        let back: ImageRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, image);
    }

    #[test]
    fn test_debug_is_compact() {
        let image = ImageRef::DataUrl(format!("data:image/jpeg;base64,{}", "A".repeat(10_000)));
        let debug = format!("{:?}", image);
        assert!(debug.len() < 100);
        assert!(debug.contains("image/jpeg"));
    }
}
