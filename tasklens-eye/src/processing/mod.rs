//! Post-inference processing: confidence filtering and summary synthesis

pub mod detection;
pub mod summary;

pub use detection::{
    display_labels, format_label, Detection, DetectionPipeline, DISPLAY_THRESHOLD,
    SUMMARY_THRESHOLD,
};
pub use summary::{summarize, LOW_CONFIDENCE_SUMMARY, NO_OBJECTS_SUMMARY};
