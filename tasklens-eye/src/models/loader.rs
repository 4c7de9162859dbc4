//! Loader that produces a YOLO detector backed by ONNX Runtime

use crate::config::VisionConfig;
use crate::detector::{Detector, DetectorLoader};
use crate::error::VisionError;
use crate::models::manager::ModelManager;
use crate::models::yolo::YoloDetector;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub struct OnnxDetectorLoader {
    config: Arc<VisionConfig>,
    manager: ModelManager,
}

impl OnnxDetectorLoader {
    pub fn new(config: Arc<VisionConfig>) -> Self {
        let manager = ModelManager::new(config.clone());
        Self { config, manager }
    }
}

#[async_trait]
impl DetectorLoader for OnnxDetectorLoader {
    async fn load(&self) -> Result<Arc<dyn Detector>, VisionError> {
        self.config.validate().map_err(VisionError::Config)?;

        let model_path = self.manager.ensure_detection_model().await?;
        info!("Initializing YOLO session from {:?}", model_path);

        // Session construction parses and optimizes the graph
        let config = self.config.clone();
        let detector = tokio::task::spawn_blocking(move || YoloDetector::new(&model_path, &config))
            .await
            .map_err(|e| VisionError::ModelLoad(format!("Model load task failed: {}", e)))??;

        Ok(Arc::new(detector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_download() {
        let mut config = VisionConfig::default();
        config.input_size = 0;
        let loader = OnnxDetectorLoader::new(Arc::new(config));

        assert!(matches!(loader.load().await, Err(VisionError::Config(_))));
    }

    #[tokio::test]
    async fn test_missing_model_without_url_fails() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut config = VisionConfig::default();
        config.model_path = temp_dir.path().to_path_buf();
        config.model_url = String::new();
        let loader = OnnxDetectorLoader::new(Arc::new(config));

        assert!(matches!(loader.load().await, Err(VisionError::ModelLoad(_))));
    }
}
