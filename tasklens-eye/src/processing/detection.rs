//! Object detection pipeline and confidence filtering

use crate::decode::DecodedImage;
use crate::detector::Detector;
use crate::error::VisionError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Detections strictly above this confidence are listed to the user
pub const DISPLAY_THRESHOLD: f32 = 0.4;

/// Detections strictly above this confidence count as confidently detected
pub const SUMMARY_THRESHOLD: f32 = 0.5;

/// One object hypothesis produced by the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub class_id: usize,
    pub bbox: (f32, f32, f32, f32), // x, y, width, height in source pixels
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
            class_id: 0,
            bbox: (0.0, 0.0, 0.0, 0.0),
        }
    }
}

/// `"<label> (<percent>%)"`
pub fn format_label(detection: &Detection) -> String {
    format!(
        "{} ({}%)",
        detection.label,
        (detection.confidence * 100.0).round() as i64
    )
}

/// Display labels for every detection above `threshold`, in detector order
pub fn display_labels(detections: &[Detection], threshold: f32) -> Vec<String> {
    detections
        .iter()
        .filter(|d| d.confidence > threshold)
        .map(format_label)
        .collect()
}

/// Runs a loaded detector off the async executor
pub struct DetectionPipeline {
    detector: Arc<dyn Detector>,
}

impl DetectionPipeline {
    pub fn new(detector: Arc<dyn Detector>) -> Self {
        Self { detector }
    }

    /// Detect objects in a decoded image.
    ///
    /// Inference is CPU-bound, so it runs on the blocking pool and the caller
    /// simply awaits its completion.
    pub async fn detect(&self, image: DecodedImage) -> Result<Vec<Detection>, VisionError> {
        debug!(
            "Running object detection on {}x{} image",
            image.width(),
            image.height()
        );
        let detector = self.detector.clone();
        let detections = tokio::task::spawn_blocking(move || detector.detect(&image))
            .await
            .map_err(|e| VisionError::Inference(format!("Detection task failed: {}", e)))??;
        debug!("Detected {} objects", detections.len());
        Ok(detections)
    }
}
