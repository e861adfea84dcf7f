//! Batch driver: turns label-table rows into validated JSONL training records.
//!
//! Rows are processed strictly one at a time. Per-row problems are counted and
//! reported through the [`RunContext`]; only output write failures abort a run.

use crate::error::TrainingResult;
use crate::jsonl::JsonlWriter;
use crate::labels::LabelRow;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::record::RecordBuilder;
use crate::sentinel::failure_marker;
use crate::validate::{validate_record, Rejection};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Object-store collaborator: puts a local file at `bucket/key` and returns its URI.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> TrainingResult<String>;
}

/// Uploader for images that are already in the bucket: returns the URI only.
#[derive(Debug, Default)]
pub struct StagedImages;

#[async_trait]
impl ImageUploader for StagedImages {
    async fn upload(&self, _local_path: &Path, bucket: &str, key: &str) -> TrainingResult<String> {
        Ok(s3_uri(bucket, key))
    }
}

pub fn s3_uri(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}

/// Object key for an image under `prefix`.
pub fn object_key(prefix: &str, image_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() { image_name.to_string() } else { format!("{prefix}/{image_name}") }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    FailureMarker(&'static str),
    EmptyLabel,
}

impl SkipReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::FailureMarker(_) => "failure_marker",
            Self::EmptyLabel => "empty_label",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailureMarker(marker) => write!(f, "label carries failure marker '{marker}'"),
            Self::EmptyLabel => f.write_str("empty label"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    UnreadableRow(String),
    MissingField(&'static str),
    MissingImage(PathBuf),
    InvalidImageName(String),
    Upload(String),
    Invalid(Rejection),
}

impl FailureReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnreadableRow(_) => "unreadable_row",
            Self::MissingField(_) => "missing_field",
            Self::MissingImage(_) => "missing_image",
            Self::InvalidImageName(_) => "invalid_image_name",
            Self::Upload(_) => "upload",
            Self::Invalid(_) => "invalid_record",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnreadableRow(e) => write!(f, "unreadable row: {e}"),
            Self::MissingField(field) => write!(f, "missing {field} field"),
            Self::MissingImage(path) => write!(f, "image not found: {}", path.display()),
            Self::InvalidImageName(name) => write!(f, "image name is not a plain file name: {name}"),
            Self::Upload(e) => write!(f, "upload failed: {e}"),
            Self::Invalid(rejection) => write!(f, "validation failed: {rejection}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Written { uri: String },
    Skipped(SkipReason),
    Failed(FailureReason),
}

/// Final tri-count of a run, with a per-reason breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: BTreeMap<String, usize>,
    pub skips: BTreeMap<String, usize>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

/// Counters and the progress sink for one run.
pub struct RunContext<'a> {
    summary: BatchSummary,
    progress: &'a dyn ProgressSink,
}

impl<'a> RunContext<'a> {
    pub fn new(progress: &'a dyn ProgressSink) -> Self {
        Self { summary: BatchSummary::default(), progress }
    }

    pub fn summary(&self) -> &BatchSummary {
        &self.summary
    }

    pub fn started(&self, source: impl Into<String>) {
        self.progress.on_event(ProgressEvent::Started { source: source.into() });
    }

    fn record(&mut self, row: usize, image: Option<&str>, outcome: &RowOutcome) {
        let image = image.map(str::to_string);
        match outcome {
            RowOutcome::Written { uri } => {
                self.summary.succeeded += 1;
                self.progress.on_event(ProgressEvent::Written {
                    row,
                    image: image.unwrap_or_default(),
                    uri: uri.clone(),
                });
            }
            RowOutcome::Skipped(reason) => {
                self.summary.skipped += 1;
                *self.summary.skips.entry(reason.code().to_string()).or_default() += 1;
                self.progress.on_event(ProgressEvent::Skipped { row, image, reason: reason.to_string() });
            }
            RowOutcome::Failed(reason) => {
                self.summary.failed += 1;
                *self.summary.failures.entry(reason.code().to_string()).or_default() += 1;
                self.progress.on_event(ProgressEvent::Failed { row, image, reason: reason.to_string() });
            }
        }
    }

    /// Emit the final summary event and hand back the counters.
    pub fn finish(self) -> BatchSummary {
        self.progress.on_event(ProgressEvent::Finished {
            succeeded: self.summary.succeeded,
            failed: self.summary.failed,
            skipped: self.summary.skipped,
        });
        self.summary
    }
}

/// Where images live locally and where they go remotely.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub images_dir: PathBuf,
    pub bucket: String,
    pub key_prefix: String,
    pub account_id: String,
}

pub struct BatchDriver<'u> {
    builder: RecordBuilder,
    uploader: &'u dyn ImageUploader,
    options: DriverOptions,
}

impl<'u> BatchDriver<'u> {
    pub fn new(builder: RecordBuilder, uploader: &'u dyn ImageUploader, options: DriverOptions) -> Self {
        Self { builder, uploader, options }
    }

    /// Process every row, appending valid records to `out`.
    ///
    /// Returns the run summary. Fails only when writing to `out` fails.
    pub async fn run<I, W>(
        &self,
        rows: I,
        out: &mut JsonlWriter<W>,
        mut ctx: RunContext<'_>,
    ) -> TrainingResult<BatchSummary>
    where
        I: IntoIterator<Item = TrainingResult<LabelRow>>,
        W: Write,
    {
        for (idx, row) in rows.into_iter().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    let outcome = RowOutcome::Failed(FailureReason::UnreadableRow(e.to_string()));
                    ctx.record(idx + 1, None, &outcome);
                    continue;
                }
            };
            let outcome = self.process_row(&row, out).await?;
            ctx.record(row.row, row.image_name.as_deref(), &outcome);
        }

        Ok(ctx.finish())
    }

    async fn process_row<W: Write>(&self, row: &LabelRow, out: &mut JsonlWriter<W>) -> TrainingResult<RowOutcome> {
        if let Some(label) = row.label.as_deref() {
            if let Some(marker) = failure_marker(label) {
                return Ok(RowOutcome::Skipped(SkipReason::FailureMarker(marker)));
            }
            if label.trim().is_empty() {
                return Ok(RowOutcome::Skipped(SkipReason::EmptyLabel));
            }
        }

        let Some(image_name) = row.image_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(RowOutcome::Failed(FailureReason::MissingField("image")));
        };
        let Some(label) = row.label.as_deref() else {
            return Ok(RowOutcome::Failed(FailureReason::MissingField("label")));
        };
        if !is_plain_file_name(image_name) {
            return Ok(RowOutcome::Failed(FailureReason::InvalidImageName(image_name.to_string())));
        }

        let image_path = self.options.images_dir.join(image_name);
        if !image_path.is_file() {
            return Ok(RowOutcome::Failed(FailureReason::MissingImage(image_path)));
        }

        let key = object_key(&self.options.key_prefix, image_name);
        let uri = match self.uploader.upload(&image_path, &self.options.bucket, &key).await {
            Ok(uri) => uri,
            Err(e) => return Ok(RowOutcome::Failed(FailureReason::Upload(e.to_string()))),
        };

        let record = self.builder.build(image_name, label, &uri, &self.options.account_id);
        if let Err(rejection) = validate_record(&record) {
            return Ok(RowOutcome::Failed(FailureReason::Invalid(rejection)));
        }

        out.write_record(&record)?;
        Ok(RowOutcome::Written { uri })
    }
}

/// Image names must stay inside the image directory: one normal path component.
fn is_plain_file_name(name: &str) -> bool {
    Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}
