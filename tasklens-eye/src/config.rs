//! Configuration for tasklens-eye

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// YOLOv8 nano exported to ONNX; 80 COCO classes, 640x640 input
pub const DEFAULT_MODEL_URL: &str =
    "https://github.com/ultralytics/assets/releases/download/v8.2.0/yolov8n.onnx";
pub const DEFAULT_MODEL_FILE: &str = "yolov8n.onnx";

/// Image analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Directory holding downloaded models
    pub model_path: PathBuf,
    /// File name of the detection model inside `model_path`
    pub model_file: String,
    /// Where to fetch the model when it is not on disk
    pub model_url: String,
    /// Expected SHA-256 of the model download (hex); empty skips verification
    pub model_checksum: String,
    /// Square model input edge in pixels
    pub input_size: u32,
    /// Minimum class score for a raw candidate to leave the detector
    pub candidate_threshold: f32,
    /// Detections above this confidence are listed to the user
    pub display_threshold: f32,
    /// Detections above this confidence count towards the summary sentence
    pub summary_threshold: f32,
    /// IoU above which overlapping boxes of the same class are suppressed
    pub iou_threshold: f32,
    /// Maximum detections returned per image
    pub max_detections: usize,
    /// Largest encoded image accepted, in bytes
    pub max_image_bytes: usize,
    /// Largest decoded image accepted, in pixels
    pub max_image_pixels: u64,
    /// Model download timeout in seconds
    pub download_timeout_secs: u64,
    /// ONNX Runtime intra-op threads; 0 lets the runtime decide
    pub intra_threads: usize,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model_path: tasklens_core::config::default_home().join("models"),
            model_file: DEFAULT_MODEL_FILE.to_string(),
            model_url: DEFAULT_MODEL_URL.to_string(),
            model_checksum: String::new(),
            input_size: 640,
            candidate_threshold: 0.25,
            display_threshold: crate::processing::DISPLAY_THRESHOLD,
            summary_threshold: crate::processing::SUMMARY_THRESHOLD,
            iou_threshold: 0.45,
            max_detections: 100,
            max_image_bytes: 32 * 1024 * 1024,
            max_image_pixels: 100_000_000,
            download_timeout_secs: 3600,
            intra_threads: 0,
        }
    }
}

impl VisionConfig {
    /// Default configuration with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from `TASKLENS_MODEL_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("TASKLENS_MODEL_DIR") {
            if !dir.trim().is_empty() {
                self.model_path = PathBuf::from(dir);
            }
        }

        if let Ok(url) = std::env::var("TASKLENS_MODEL_URL") {
            if !url.trim().is_empty() {
                self.model_url = url;
            }
        }

        if let Ok(file) = std::env::var("TASKLENS_MODEL_FILE") {
            if !file.trim().is_empty() {
                self.model_file = file;
            }
        }

        if let Ok(checksum) = std::env::var("TASKLENS_MODEL_SHA256") {
            self.model_checksum = checksum.trim().to_lowercase();
        }
    }

    /// Full path of the detection model file
    pub fn model_file_path(&self) -> PathBuf {
        self.model_path.join(&self.model_file)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.input_size == 0 || self.input_size > 4096 {
            return Err("Input size must be between 1 and 4096".to_string());
        }

        if self.input_size % 32 != 0 {
            return Err("Input size must be a multiple of 32".to_string());
        }

        for (name, value) in [
            ("candidate_threshold", self.candidate_threshold),
            ("display_threshold", self.display_threshold),
            ("summary_threshold", self.summary_threshold),
            ("iou_threshold", self.iou_threshold),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be between 0 and 1", name));
            }
        }

        if self.max_detections == 0 || self.max_detections > 1000 {
            return Err("max_detections must be between 1 and 1000".to_string());
        }

        if self.max_image_bytes == 0 {
            return Err("max_image_bytes must be non-zero".to_string());
        }

        if self.max_image_pixels == 0 {
            return Err("max_image_pixels must be non-zero".to_string());
        }

        if self.model_file.is_empty()
            || self.model_file.contains("..")
            || self.model_file.contains('/')
            || self.model_file.contains('\\')
        {
            return Err("model_file must be a plain file name".to_string());
        }

        if !self.model_checksum.is_empty()
            && (self.model_checksum.len() != 64
                || !self.model_checksum.chars().all(|c| c.is_ascii_hexdigit()))
        {
            return Err("model_checksum must be a 64-character SHA-256 hex digest".to_string());
        }

        Ok(())
    }
}
