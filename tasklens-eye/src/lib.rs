//! tasklens-eye: on-device image analysis for proof photos
//!
//! Runs an object detector over a photo and reports what it saw as a list of
//! labelled confidences plus a one-sentence summary. The detector is loaded
//! lazily on first use and shared by every analysis for the rest of the
//! process.
//!
//! The public contract is a single call, [`analyze_image`], which never fails:
//! errors at any stage are logged and turned into an empty result carrying a
//! short user-facing message.

pub mod analyzer;
pub mod config;
pub mod decode;
pub mod detector;
pub mod error;
pub mod models;
pub mod processing;
mod utils;

pub use analyzer::{
    analyze_image, install_shared_analyzer, shared_analyzer, AnalysisResult, AnalysisToken,
    AnalysisTracker, ImageAnalyzer,
};
pub use config::VisionConfig;
pub use decode::{decode_image, DecodedImage};
pub use detector::{Detector, DetectorCell, DetectorLoader};
pub use error::VisionError;
pub use processing::{Detection, DISPLAY_THRESHOLD, SUMMARY_THRESHOLD};
