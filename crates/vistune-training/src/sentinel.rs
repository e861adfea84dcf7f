//! Failure markers left in label columns by the labelling step.
//!
//! A label containing any of these substrings means the upstream extraction
//! failed and the row must not reach the dataset.

/// "Extraction failed", written by the labelling step when a model call errors.
pub const EXTRACTION_FAILED: &str = "提取失败";

/// "Processing failed". vistune never writes it; it only arrives in label tables
/// produced by external image-conversion tooling.
pub const PROCESSING_FAILED: &str = "处理失败";

/// Error name surfaced by Bedrock when the request was throttled.
pub const THROTTLED: &str = "ThrottlingException";

pub const FAILURE_MARKERS: &[&str] = &[EXTRACTION_FAILED, PROCESSING_FAILED, THROTTLED];

/// The first failure marker contained in `label`, if any.
pub fn failure_marker(label: &str) -> Option<&'static str> {
    FAILURE_MARKERS.iter().copied().find(|marker| label.contains(marker))
}

/// Format the label written for a failed extraction.
pub fn extraction_failure_label(error: &str) -> String {
    format!("{EXTRACTION_FAILED}: {error}")
}
