//! YOLO object detection model

use crate::config::VisionConfig;
use crate::decode::DecodedImage;
use crate::detector::Detector;
use crate::error::VisionError;
use crate::processing::Detection;
use crate::utils::{compute_iou, rgb_to_chw_tensor};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info};

/// COCO class names (80 classes)
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Post-processing parameters shared by the detector and its output parser
#[derive(Debug, Clone, Copy)]
pub struct YoloParams {
    pub input_size: u32,
    pub candidate_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl From<&VisionConfig> for YoloParams {
    fn from(config: &VisionConfig) -> Self {
        Self {
            input_size: config.input_size,
            candidate_threshold: config.candidate_threshold,
            iou_threshold: config.iou_threshold,
            max_detections: config.max_detections,
        }
    }
}

/// YOLOv8 detector running on ONNX Runtime
pub struct YoloDetector {
    // Running a session needs exclusive access
    session: Mutex<Session>,
    params: YoloParams,
}

impl YoloDetector {
    /// Load a YOLO model from an ONNX file
    pub fn new(model_path: &Path, config: &VisionConfig) -> Result<Self, VisionError> {
        let builder = Session::builder()
            .map_err(|e| VisionError::Ort(format!("Failed to create session builder: {}", e)))?;
        let mut builder = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VisionError::Ort(format!("Failed to set optimization level: {}", e)))?;
        if config.intra_threads > 0 {
            builder = builder
                .with_intra_threads(config.intra_threads)
                .map_err(|e| VisionError::Ort(format!("Failed to set thread count: {}", e)))?;
        }
        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| VisionError::Ort(format!("Failed to load YOLO model: {}", e)))?;

        info!("YOLO model loaded from {:?}", model_path);

        Ok(Self {
            session: Mutex::new(session),
            params: YoloParams::from(config),
        })
    }

    /// Resize and normalize into a `[1, 3, S, S]` input tensor
    fn preprocess(&self, image: &DecodedImage) -> Result<Tensor<f32>, VisionError> {
        let size = self.params.input_size;
        let data = rgb_to_chw_tensor(image.pixels(), size)?;
        let shape = [1usize, 3, size as usize, size as usize];
        Tensor::from_array((shape, data.into_boxed_slice()))
            .map_err(|e| VisionError::Ort(format!("Failed to create input tensor: {}", e)))
    }
}

impl Detector for YoloDetector {
    fn detect(&self, image: &DecodedImage) -> Result<Vec<Detection>, VisionError> {
        debug!("Running YOLO detection on {}x{} image", image.width(), image.height());

        let input = self.preprocess(image)?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::Inference(format!("YOLO inference failed: {}", e)))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::Inference(format!("Failed to extract output tensor: {}", e)))?;
        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        debug!("YOLO output shape: {:?}", dims);

        let candidates = parse_output(data, &dims, &self.params, (image.width(), image.height()))?;
        let detections = apply_nms(candidates, self.params.iou_threshold, self.params.max_detections);

        debug!("YOLO detected {} objects", detections.len());
        Ok(detections)
    }

    fn name(&self) -> &str {
        "yolov8"
    }
}

/// Decode a raw YOLOv8 output tensor into candidate detections.
///
/// Accepts both `[1, 4 + C, N]` (the stock export) and the transposed
/// `[1, N, 4 + C]` layout. Boxes come back scaled to the source image.
pub fn parse_output(
    data: &[f32],
    dims: &[usize],
    params: &YoloParams,
    frame: (u32, u32),
) -> Result<Vec<Detection>, VisionError> {
    if dims.len() != 3 || dims[0] != 1 {
        return Err(VisionError::Inference(format!("Unexpected output shape {:?}", dims)));
    }

    // Anchors always outnumber attributes in real exports
    let attrs_major = dims[1] < dims[2];
    let (attrs, anchors) = if attrs_major { (dims[1], dims[2]) } else { (dims[2], dims[1]) };
    if attrs <= 4 {
        return Err(VisionError::Inference(format!("Output has no class scores: {:?}", dims)));
    }
    let expected = attrs
        .checked_mul(anchors)
        .ok_or_else(|| VisionError::Inference("Output shape would overflow".to_string()))?;
    if data.len() != expected {
        return Err(VisionError::Inference(format!(
            "Output length {} does not match shape {:?}",
            data.len(),
            dims
        )));
    }

    let value = |attr: usize, anchor: usize| -> f32 {
        if attrs_major {
            data[attr * anchors + anchor]
        } else {
            data[anchor * attrs + attr]
        }
    };

    let (frame_w, frame_h) = (frame.0 as f32, frame.1 as f32);
    if frame_w <= 0.0 || frame_h <= 0.0 {
        return Ok(Vec::new());
    }
    let scale_x = frame_w / params.input_size as f32;
    let scale_y = frame_h / params.input_size as f32;

    let mut detections = Vec::new();
    for anchor in 0..anchors {
        let mut best_class = 0;
        let mut best_score = f32::MIN;
        for class_id in 0..attrs - 4 {
            let score = value(4 + class_id, anchor);
            if score > best_score {
                best_score = score;
                best_class = class_id;
            }
        }

        if !best_score.is_finite() || best_score <= params.candidate_threshold {
            continue;
        }

        let (cx, cy, w, h) = (value(0, anchor), value(1, anchor), value(2, anchor), value(3, anchor));
        if ![cx, cy, w, h].iter().all(|v| v.is_finite()) {
            continue;
        }

        let x = ((cx - w / 2.0) * scale_x).clamp(0.0, frame_w);
        let y = ((cy - h / 2.0) * scale_y).clamp(0.0, frame_h);
        let bbox_w = (w * scale_x).min(frame_w - x);
        let bbox_h = (h * scale_y).min(frame_h - y);
        if bbox_w <= 0.0 || bbox_h <= 0.0 {
            continue;
        }

        let label = COCO_CLASSES
            .get(best_class)
            .map(|name| name.to_string())
            .unwrap_or_else(|| format!("class {}", best_class));

        detections.push(Detection {
            label,
            confidence: best_score.min(1.0),
            class_id: best_class,
            bbox: (x, y, bbox_w, bbox_h),
        });
    }

    Ok(detections)
}

/// Class-wise non-maximum suppression; output sorted by descending confidence
pub fn apply_nms(
    mut detections: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    detections.retain(|d| d.confidence.is_finite() && (0.0..=1.0).contains(&d.confidence));
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in detections {
        if keep.len() >= max_detections {
            break;
        }
        let suppressed = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id
                && compute_iou(&kept.bbox, &candidate.bbox) > iou_threshold
        });
        if !suppressed {
            keep.push(candidate);
        }
    }

    keep
}
