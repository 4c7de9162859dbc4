//! Image analysis orchestration
//!
//! [`ImageAnalyzer`] chains the stages of one analysis: make sure the detector
//! is loaded, decode the photo, detect objects, then turn detections into
//! display labels and a summary sentence. Any failure along the way is logged
//! and reported through [`AnalysisResult::failed`], so callers always get a
//! result to show.

use crate::config::VisionConfig;
use crate::decode::decode_image;
use crate::detector::{Detector, DetectorCell, DetectorLoader};
use crate::error::VisionError;
use crate::models::OnnxDetectorLoader;
use crate::processing::{display_labels, summarize, DetectionPipeline};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tasklens_core::ImageRef;
use tracing::{debug, info, warn};

/// Outcome of analyzing one image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// `"<label> (<percent>%)"` for each detection above the display threshold
    pub labels: Vec<String>,
    pub summary: String,
}

impl AnalysisResult {
    /// Empty result carrying the user-facing message for `err`
    pub fn failed(err: &VisionError) -> Self {
        Self {
            labels: Vec::new(),
            summary: err.user_message().to_string(),
        }
    }
}

pub struct ImageAnalyzer {
    config: Arc<VisionConfig>,
    detector: DetectorCell,
}

impl ImageAnalyzer {
    pub fn new(config: Arc<VisionConfig>, loader: Arc<dyn DetectorLoader>) -> Self {
        Self {
            config,
            detector: DetectorCell::new(loader),
        }
    }

    /// Analyzer backed by the ONNX YOLO detector. Nothing is loaded until the
    /// first analysis.
    pub fn with_onnx(config: Arc<VisionConfig>) -> Self {
        let loader = Arc::new(OnnxDetectorLoader::new(config.clone()));
        Self::new(config, loader)
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    pub fn is_detector_loaded(&self) -> bool {
        self.detector.is_loaded()
    }

    /// Load the detector now instead of on first analysis
    pub async fn ensure_detector_loaded(&self) -> Result<Arc<dyn Detector>, VisionError> {
        self.detector.ensure_loaded().await
    }

    /// Run every stage, stopping at the first error
    pub async fn try_analyze(&self, image: &ImageRef) -> Result<AnalysisResult, VisionError> {
        let started = Instant::now();

        let detector = self.detector.ensure_loaded().await?;
        let decoded = decode_image(image, &self.config).await?;
        let detections = DetectionPipeline::new(detector).detect(decoded).await?;

        let labels = display_labels(&detections, self.config.display_threshold);
        let summary = summarize(&detections, self.config.summary_threshold);

        info!(
            "Analyzed {}: {} detections, {} shown in {:?}",
            image.describe(),
            detections.len(),
            labels.len(),
            started.elapsed()
        );
        Ok(AnalysisResult { labels, summary })
    }

    /// Analyze an image. Never fails; errors become an empty result with a
    /// short message.
    pub async fn analyze(&self, image: &ImageRef) -> AnalysisResult {
        match self.try_analyze(image).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Image analysis failed for {}: {}", image.describe(), e);
                AnalysisResult::failed(&e)
            }
        }
    }

    /// Like [`analyze`](Self::analyze), but returns `None` if `token` was
    /// superseded while the analysis ran.
    pub async fn analyze_tracked(
        &self,
        tracker: &AnalysisTracker,
        token: &AnalysisToken,
        image: &ImageRef,
    ) -> Option<AnalysisResult> {
        let result = self.analyze(image).await;
        if tracker.is_current(token) {
            Some(result)
        } else {
            debug!(
                "Discarding stale analysis for '{}' (generation {})",
                token.slot, token.generation
            );
            None
        }
    }
}

/// Identifies one analysis request for a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisToken {
    pub slot: String,
    pub generation: u64,
}

/// Tracks the latest analysis request per slot (typically a task id).
///
/// Issuing a new token for a slot supersedes every earlier one, so a slow
/// analysis of a replaced photo can be recognized and dropped.
#[derive(Debug, Default)]
pub struct AnalysisTracker {
    next: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
}

impl AnalysisTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, slot: impl Into<String>) -> AnalysisToken {
        let slot = slot.into();
        let generation = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest.lock().insert(slot.clone(), generation);
        AnalysisToken { slot, generation }
    }

    pub fn is_current(&self, token: &AnalysisToken) -> bool {
        self.latest.lock().get(&token.slot) == Some(&token.generation)
    }

    /// Drop a slot, invalidating its outstanding token
    pub fn forget(&self, slot: &str) {
        self.latest.lock().remove(slot);
    }
}

static SHARED_ANALYZER: OnceLock<ImageAnalyzer> = OnceLock::new();

/// Process-wide analyzer, configured from the environment on first use
pub fn shared_analyzer() -> &'static ImageAnalyzer {
    SHARED_ANALYZER.get_or_init(|| ImageAnalyzer::with_onnx(Arc::new(VisionConfig::from_env())))
}

/// Install the process-wide analyzer. Returns `false` if one already exists.
pub fn install_shared_analyzer(analyzer: ImageAnalyzer) -> bool {
    SHARED_ANALYZER.set(analyzer).is_ok()
}

/// Analyze an image with the process-wide analyzer
pub async fn analyze_image(image: &ImageRef) -> AnalysisResult {
    shared_analyzer().analyze(image).await
}
