//! Model manager with auto-download functionality

use crate::config::VisionConfig;
use crate::error::VisionError;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const MAX_MODEL_SIZE: usize = 2_000_000_000; // 2GB max
const MIN_MODEL_SIZE: usize = 1024;

/// Locates detection models on disk, downloading them when missing
pub struct ModelManager {
    config: Arc<VisionConfig>,
}

impl ModelManager {
    pub fn new(config: Arc<VisionConfig>) -> Self {
        Self { config }
    }

    /// Ensure model directory exists
    pub fn ensure_model_dir(&self) -> Result<PathBuf, VisionError> {
        let model_path = &self.config.model_path;
        if !model_path.exists() {
            fs::create_dir_all(model_path).map_err(|e| {
                VisionError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create model directory {:?}: {}", model_path, e),
                ))
            })?;
            info!("Created model directory: {:?}", model_path);
        }
        Ok(model_path.clone())
    }

    /// Path of the configured detection model, downloading it if needed
    pub async fn ensure_detection_model(&self) -> Result<PathBuf, VisionError> {
        self.ensure_model(
            &self.config.model_file,
            &self.config.model_url,
            &self.config.model_checksum,
        )
        .await
    }

    /// Download model if not present
    pub async fn ensure_model(
        &self,
        model_name: &str,
        url: &str,
        checksum: &str,
    ) -> Result<PathBuf, VisionError> {
        if model_name.is_empty() || model_name.len() > 255 {
            return Err(VisionError::ModelLoad("Invalid model name".to_string()));
        }

        if model_name.contains("..") || model_name.contains('/') || model_name.contains('\\') {
            return Err(VisionError::ModelLoad(
                "Model name contains invalid characters".to_string(),
            ));
        }

        let model_path = self.config.model_path.join(model_name);
        if model_path.is_file() {
            info!("Model {} found at {:?}", model_name, model_path);
            return Ok(model_path);
        }

        if url.is_empty() || url.len() > 2048 {
            return Err(VisionError::ModelLoad("Invalid model URL".to_string()));
        }

        if !url.starts_with("https://") {
            return Err(VisionError::ModelLoad(
                "Only HTTPS URLs are allowed for model downloads".to_string(),
            ));
        }

        self.ensure_model_dir()?;
        info!("Downloading model {} from {}", model_name, url);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.download_timeout_secs))
            .build()?;

        let response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(VisionError::ModelLoad(format!(
                "Failed to download model: HTTP {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > MAX_MODEL_SIZE as u64 {
                return Err(VisionError::ModelLoad(format!(
                    "Model too large: {} bytes (max {} bytes)",
                    content_length, MAX_MODEL_SIZE
                )));
            }
        }

        let bytes = response.bytes().await?;
        if bytes.len() > MAX_MODEL_SIZE {
            return Err(VisionError::ModelLoad(format!(
                "Downloaded model too large: {} bytes (max {} bytes)",
                bytes.len(),
                MAX_MODEL_SIZE
            )));
        }
        if bytes.len() < MIN_MODEL_SIZE {
            return Err(VisionError::ModelLoad(
                "Downloaded file too small, likely corrupted".to_string(),
            ));
        }

        if checksum.is_empty() {
            warn!(
                "Downloaded {} bytes for model {} (checksum verification skipped)",
                bytes.len(),
                model_name
            );
        } else {
            verify_checksum(&bytes, checksum)?;
            info!("Verified checksum for model {}", model_name);
        }

        // Temp file then rename, so a partial download never looks like a model
        let temp_path = model_path.with_extension("onnx.part");
        write_model_file(&temp_path, &model_path, &bytes)?;

        info!("Model {} saved to {:?}", model_name, model_path);
        Ok(model_path)
    }
}

/// Write `bytes` to `temp_path` and move it to `final_path`; the temp file is
/// removed if either step fails
fn write_model_file(temp_path: &Path, final_path: &Path, bytes: &[u8]) -> Result<(), VisionError> {
    let result = fs::write(temp_path, bytes).and_then(|()| fs::rename(temp_path, final_path));
    if let Err(e) = result {
        let _ = fs::remove_file(temp_path);
        return Err(VisionError::Io(e));
    }
    Ok(())
}

/// Compare the SHA-256 of `bytes` against a hex digest
pub fn verify_checksum(bytes: &[u8], expected: &str) -> Result<(), VisionError> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let computed = hex::encode(hasher.finalize());
    if computed.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(VisionError::ModelLoad(format!(
            "Checksum mismatch: expected {}, got {}",
            expected, computed
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager_in(dir: &TempDir) -> ModelManager {
        let mut config = VisionConfig::default();
        config.model_path = dir.path().join("models");
        ModelManager::new(Arc::new(config))
    }

    #[tokio::test]
    async fn test_ensure_model_dir_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_in(&temp_dir);

        let dir = manager.ensure_model_dir().unwrap();
        assert!(dir.is_dir());
        assert!(manager.ensure_model_dir().is_ok());
    }

    #[tokio::test]
    async fn test_existing_model_is_not_downloaded() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_in(&temp_dir);
        let dir = manager.ensure_model_dir().unwrap();
        fs::write(dir.join("yolov8n.onnx"), b"model").unwrap();

        // An unusable URL proves no network access happens
        let path = manager.ensure_model("yolov8n.onnx", "", "").await.unwrap();
        assert_eq!(path, dir.join("yolov8n.onnx"));

        let path = manager.ensure_detection_model().await.unwrap();
        assert_eq!(path, dir.join("yolov8n.onnx"));
    }

    #[tokio::test]
    async fn test_ensure_model_invalid_name() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_in(&temp_dir);

        for name in ["", "../evil", "model/name", "model\\name"] {
            let result = manager.ensure_model(name, "https://example.com/model.onnx", "").await;
            assert!(matches!(result, Err(VisionError::ModelLoad(_))), "accepted {:?}", name);
        }
    }

    #[tokio::test]
    async fn test_ensure_model_invalid_url() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_in(&temp_dir);

        for url in ["", "http://example.com/model.onnx", "ftp://example.com/model.onnx"] {
            let result = manager.ensure_model("model.onnx", url, "").await;
            assert!(matches!(result, Err(VisionError::ModelLoad(_))), "accepted {:?}", url);
        }
    }

    #[test]
    fn test_write_model_file() {
        let temp_dir = TempDir::new().unwrap();
        let temp_path = temp_dir.path().join("model.onnx.part");
        let final_path = temp_dir.path().join("model.onnx");

        write_model_file(&temp_path, &final_path, b"weights").unwrap();
        assert_eq!(fs::read(&final_path).unwrap(), b"weights");
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_write_model_file_cleans_up_on_failure() {
        let temp_dir = TempDir::new().unwrap();
        let temp_path = temp_dir.path().join("model.onnx.part");
        // A non-empty directory at the destination makes the rename fail
        let final_path = temp_dir.path().join("model.onnx");
        fs::create_dir_all(final_path.join("occupied")).unwrap();

        assert!(write_model_file(&temp_path, &final_path, b"weights").is_err());
        assert!(!temp_path.exists());

        // Writing into a missing directory fails before anything is created
        let missing = temp_dir.path().join("missing").join("model.onnx.part");
        assert!(write_model_file(&missing, &final_path, b"weights").is_err());
        assert!(!missing.exists());
    }

    #[test]
    fn test_verify_checksum() {
        // SHA-256 of "abc"
        let digest = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert!(verify_checksum(b"abc", digest).is_ok());
        assert!(verify_checksum(b"abc", &digest.to_uppercase()).is_ok());
        assert!(verify_checksum(b"abd", digest).is_err());
    }
}
