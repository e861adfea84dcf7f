//! Vistune Training
//!
//! Dataset primitives for fine-tuning a vision-language model on
//! image-to-label pairs:
//! - Building and validating conversation training records
//! - Reading label tables and filtering failed labels
//! - Driving a label table through upload, build and validation into JSONL
//! - Dataset-level format checks, train/test split, job specs and metrics

pub mod config;
pub mod converse;
pub mod driver;
pub mod error;
pub mod job;
pub mod jsonl;
pub mod labeling;
pub mod labels;
pub mod metrics;
pub mod progress;
pub mod record;
pub mod scan;
pub mod sentinel;
pub mod split;
pub mod validate;

pub use config::VistuneConfig;
pub use converse::{validate_dataset_file, ConverseOptions, DatasetReport, ModelFamily};
pub use driver::{BatchDriver, BatchSummary, DriverOptions, ImageUploader, RunContext, StagedImages};
pub use error::{TrainingError, TrainingResult};
pub use job::{CustomizationJobSpec, HyperParameters, JobStatus};
pub use jsonl::{read_jsonl_records, JsonlWriter};
pub use labeling::{generate_labels, LabelModel, LabelingSummary};
pub use labels::{LabelColumns, LabelReader, LabelRow, LabelWriter};
pub use metrics::{read_step_metrics, MetricsReport, StepMetric};
pub use progress::{NullProgressSink, ProgressEvent, ProgressSink, TracingProgressSink};
pub use record::{build_record, RecordBuilder, TrainingRecord, SCHEMA_VERSION};
pub use sentinel::{extraction_failure_label, failure_marker};
pub use split::{split_dataset, SplitOptions, SplitOutcome};
pub use validate::{validate_record, validate_value, Rejection};
