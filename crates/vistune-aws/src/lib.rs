//! AWS collaborators for vistune, driven through the `aws` command-line tool.
//!
//! - [`S3Client`]: object upload, existence checks and prefix listings
//! - [`BedrockClient`]: Converse labelling and model customization jobs

pub mod bedrock;
pub mod error;
pub mod runner;
pub mod s3;

pub use bedrock::{BedrockClient, JobDescription};
pub use error::{AwsError, AwsResult};
pub use runner::{AwsCli, CommandOutput, CommandRunner, ProcessRunner};
pub use s3::{parse_s3_uri, S3Client, S3Object};
