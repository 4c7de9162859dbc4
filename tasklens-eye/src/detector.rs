//! Detector abstraction and the lazily loaded, shared detector handle

use crate::decode::DecodedImage;
use crate::error::VisionError;
use crate::processing::Detection;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// A ready-to-run object detector
pub trait Detector: Send + Sync {
    /// Detections for one image, ordered by descending confidence
    fn detect(&self, image: &DecodedImage) -> Result<Vec<Detection>, VisionError>;

    fn name(&self) -> &str {
        "detector"
    }
}

/// Builds a detector; may download model files and allocate runtime state
#[async_trait]
pub trait DetectorLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn Detector>, VisionError>;
}

/// Holds at most one detector for its whole lifetime.
///
/// The first call to [`ensure_loaded`](Self::ensure_loaded) starts the load;
/// callers arriving while it is in flight wait for that same load instead of
/// starting their own. A failed load leaves the cell empty so the next call
/// retries.
pub struct DetectorCell {
    loader: Arc<dyn DetectorLoader>,
    detector: OnceCell<Arc<dyn Detector>>,
}

impl DetectorCell {
    pub fn new(loader: Arc<dyn DetectorLoader>) -> Self {
        Self {
            loader,
            detector: OnceCell::new(),
        }
    }

    /// Return the shared detector, loading it on first use
    pub async fn ensure_loaded(&self) -> Result<Arc<dyn Detector>, VisionError> {
        if let Some(detector) = self.detector.get() {
            return Ok(detector.clone());
        }

        let detector = self
            .detector
            .get_or_try_init(|| async {
                info!("Loading object detection model...");
                let started = Instant::now();
                match self.loader.load().await {
                    Ok(detector) => {
                        info!(
                            "Detector '{}' ready in {:?}",
                            detector.name(),
                            started.elapsed()
                        );
                        Ok(detector)
                    }
                    Err(e) => {
                        warn!("Failed to load detector: {}", e);
                        Err(e.into_model_load())
                    }
                }
            })
            .await?;

        debug!("Using detector '{}'", detector.name());
        Ok(detector.clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.detector.initialized()
    }
}
