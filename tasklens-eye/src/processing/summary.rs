//! One-sentence scene summaries built from detection labels

use crate::processing::Detection;

pub const NO_OBJECTS_SUMMARY: &str = "No objects clearly detected";
pub const LOW_CONFIDENCE_SUMMARY: &str = "Objects detected but with low confidence";

/// Describe the confidently detected objects in one sentence.
///
/// Only labels matter here: detections above `threshold` are grouped by label
/// in first-seen order and the first three distinct labels are named. A single
/// repeated label is counted and pluralized by appending "s".
pub fn summarize(detections: &[Detection], threshold: f32) -> String {
    if detections.is_empty() {
        return NO_OBJECTS_SUMMARY.to_string();
    }

    let confident: Vec<&str> = detections
        .iter()
        .filter(|d| d.confidence > threshold)
        .map(|d| d.label.as_str())
        .collect();

    let mut distinct: Vec<&str> = Vec::new();
    for label in &confident {
        if !distinct.contains(label) {
            distinct.push(*label);
        }
    }

    match distinct.as_slice() {
        [] => LOW_CONFIDENCE_SUMMARY.to_string(),
        [only] => {
            let count = confident.iter().filter(|label| *label == only).count();
            if count > 1 {
                format!("This image shows {} {}s", count, only)
            } else {
                format!("This image shows a {}", only)
            }
        }
        [first, second] => format!("This image contains {} and {}", first, second),
        [first, second, third] => {
            format!("This image contains {}, {} and {}", first, second, third)
        }
        [first, second, third, ..] => {
            format!("This image contains {}, {}, {}, and more", first, second, third)
        }
    }
}
