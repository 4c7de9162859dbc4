//! Detection model management and inference

pub mod loader;
pub mod manager;
pub mod yolo;

pub use loader::OnnxDetectorLoader;
pub use manager::ModelManager;
pub use yolo::{YoloDetector, COCO_CLASSES};
