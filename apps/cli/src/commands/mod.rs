//! Command implementations for the vistune CLI.

pub mod job;
pub mod label;
pub mod metrics;
pub mod prepare;
pub mod split;
pub mod types;
pub mod upload;
pub mod validate;

pub use types::{JobCommand, LabelArgs, MetricsArgs, PrepareArgs, SplitArgs, UploadArgs, ValidateArgs};
