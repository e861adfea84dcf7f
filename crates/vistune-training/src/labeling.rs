//! Label generation: ask a vision model for the label of each image and
//! write the results as a label table.

use crate::error::TrainingResult;
use crate::labels::LabelWriter;
use crate::sentinel::extraction_failure_label;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Vision model collaborator: returns the raw response text for one image.
#[async_trait]
pub trait LabelModel: Send + Sync {
    async fn extract(&self, image_path: &Path, prompt: &str) -> TrainingResult<String>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelingSummary {
    pub labelled: usize,
    pub failed: usize,
}

/// Label every image in `images`, in order.
///
/// A failed call is written as a failure-marker label so the row is skipped
/// when the table is later fed to the batch driver. The writer is flushed
/// every `batch_size` rows.
pub async fn generate_labels(
    model: &dyn LabelModel,
    images: &[PathBuf],
    prompt: &str,
    writer: &mut LabelWriter,
    batch_size: usize,
) -> TrainingResult<LabelingSummary> {
    let mut summary = LabelingSummary::default();
    let batch_size = batch_size.max(1);
    let total = images.len();

    for (idx, path) in images.iter().enumerate() {
        let image_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        info!(image = %image_name, "labelling image {}/{}", idx + 1, total);

        let label = match model.extract(path, prompt).await {
            Ok(text) => {
                summary.labelled += 1;
                let text = text.trim().to_string();
                info!(image = %image_name, label = %text, "label extracted");
                text
            }
            Err(e) => {
                summary.failed += 1;
                warn!(image = %image_name, error = %e, "label extraction failed");
                extraction_failure_label(&e.to_string())
            }
        };
        writer.write_row(&image_name, &label)?;

        if (idx + 1) % batch_size == 0 {
            writer.flush()?;
            info!("processed {}/{} images", idx + 1, total);
        }
    }

    writer.flush()?;
    Ok(summary)
}
