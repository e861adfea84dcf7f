use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Per-row events emitted by the batch driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started { source: String },
    Written { row: usize, image: String, uri: String },
    Skipped { row: usize, image: Option<String>, reason: String },
    Failed { row: usize, image: Option<String>, reason: String },
    Finished { succeeded: usize, failed: usize, skipped: usize },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { source } => info!(%source, "batch started"),
            ProgressEvent::Written { row, image, uri } => info!(row, %image, %uri, "record written"),
            ProgressEvent::Skipped { row, image, reason } => {
                warn!(row, image = image.as_deref().unwrap_or("-"), %reason, "row skipped");
            }
            ProgressEvent::Failed { row, image, reason } => {
                warn!(row, image = image.as_deref().unwrap_or("-"), %reason, "row failed");
            }
            ProgressEvent::Finished { succeeded, failed, skipped } => {
                info!(succeeded, failed, skipped, total = succeeded + failed + skipped, "batch finished");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_event(&self, _event: ProgressEvent) {}
}
