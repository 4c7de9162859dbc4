//! Utility functions for vision processing

use crate::error::VisionError;
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Resize to `size`x`size` and lay out as a normalized CHW float tensor.
///
/// Output length is `3 * size * size`; channel order is R, G, B and values are
/// scaled into [0, 1].
pub fn rgb_to_chw_tensor(image: &RgbImage, size: u32) -> Result<Vec<f32>, VisionError> {
    if size == 0 {
        return Err(VisionError::Inference("Target size cannot be zero".to_string()));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(VisionError::Inference("Invalid image dimensions".to_string()));
    }

    let plane = (size as usize)
        .checked_mul(size as usize)
        .ok_or_else(|| VisionError::Inference("Target size would overflow".to_string()))?;

    let resized = imageops::resize(image, size, size, FilterType::Triangle);

    let mut tensor = vec![0.0f32; plane * 3];
    for (i, pixel) in resized.pixels().enumerate() {
        tensor[i] = f32::from(pixel[0]) / 255.0;
        tensor[plane + i] = f32::from(pixel[1]) / 255.0;
        tensor[2 * plane + i] = f32::from(pixel[2]) / 255.0;
    }

    Ok(tensor)
}

/// Intersection over union of two `(x, y, w, h)` boxes
pub fn compute_iou(bbox1: &(f32, f32, f32, f32), bbox2: &(f32, f32, f32, f32)) -> f32 {
    let (x1, y1, w1, h1) = *bbox1;
    let (x2, y2, w2, h2) = *bbox2;

    if ![x1, y1, w1, h1, x2, y2, w2, h2].iter().all(|v| v.is_finite()) {
        return 0.0;
    }
    if w1 < 0.0 || h1 < 0.0 || w2 < 0.0 || h2 < 0.0 {
        return 0.0;
    }

    let inter_x_min = x1.max(x2);
    let inter_y_min = y1.max(y2);
    let inter_x_max = (x1 + w1).min(x2 + w2);
    let inter_y_max = (y1 + h1).min(y2 + h2);

    if inter_x_max <= inter_x_min || inter_y_max <= inter_y_min {
        return 0.0;
    }

    let inter_area = (inter_x_max - inter_x_min) * (inter_y_max - inter_y_min);
    let union_area = w1 * h1 + w2 * h2 - inter_area;

    if union_area <= 0.0 || !union_area.is_finite() {
        return 0.0;
    }

    (inter_area / union_area).clamp(0.0, 1.0)
}
