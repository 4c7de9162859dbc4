//! Error types for tasklens-eye

use tasklens_core::Error as CoreError;
use thiserror::Error;

/// Shown when the detector could not be loaded or failed while running
pub const ANALYSIS_UNAVAILABLE: &str = "AI analysis unavailable";

/// Shown when the supplied image could not be decoded
pub const ANALYSIS_FAILED: &str = "Failed to analyze image";

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("ONNX Runtime error: {0}")]
    Ort(String),
}

impl VisionError {
    /// The message a user sees when analysis stops at this error.
    ///
    /// Only decode failures are reported as such; everything else reads as the
    /// analysis feature being unavailable.
    pub fn user_message(&self) -> &'static str {
        match self {
            VisionError::ImageDecode(_) => ANALYSIS_FAILED,
            _ => ANALYSIS_UNAVAILABLE,
        }
    }

    /// Wrap any error raised while bringing up the detector as a load failure
    pub fn into_model_load(self) -> Self {
        match self {
            VisionError::ModelLoad(_) => self,
            other => VisionError::ModelLoad(other.to_string()),
        }
    }
}

impl From<VisionError> for CoreError {
    fn from(err: VisionError) -> Self {
        CoreError::Vision(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_error_display() {
        let err = VisionError::ModelLoad("Test error".to_string());
        assert!(err.to_string().contains("Model load error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_vision_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let vision_err: VisionError = io_err.into();
        match vision_err {
            VisionError::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_vision_error_to_core_error() {
        let vision_err = VisionError::Inference("Test".to_string());
        let core_err: CoreError = vision_err.into();
        match core_err {
            CoreError::Vision(msg) => {
                assert!(msg.contains("Inference error"));
                assert!(msg.contains("Test"));
            }
            _ => panic!("Expected Vision error"),
        }
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(VisionError::ImageDecode("bad".into()).user_message(), ANALYSIS_FAILED);
        assert_eq!(VisionError::ModelLoad("gone".into()).user_message(), ANALYSIS_UNAVAILABLE);
        assert_eq!(VisionError::Inference("boom".into()).user_message(), ANALYSIS_UNAVAILABLE);
        assert_eq!(VisionError::Ort("ort".into()).user_message(), ANALYSIS_UNAVAILABLE);
        assert_eq!(VisionError::Config("cfg".into()).user_message(), ANALYSIS_UNAVAILABLE);
    }

    #[test]
    fn test_into_model_load() {
        match VisionError::Ort("session".into()).into_model_load() {
            VisionError::ModelLoad(msg) => assert!(msg.contains("session")),
            other => panic!("Expected ModelLoad, got {}", other),
        }
        match VisionError::ModelLoad("kept".into()).into_model_load() {
            VisionError::ModelLoad(msg) => assert_eq!(msg, "kept"),
            other => panic!("Expected ModelLoad, got {}", other),
        }
    }
}
