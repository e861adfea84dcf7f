use crate::error::{AwsError, AwsResult};
use crate::runner::AwsCli;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use vistune_training::driver::s3_uri;
use vistune_training::{ImageUploader, TrainingError, TrainingResult};

/// Split `s3://bucket/key` into its parts.
pub fn parse_s3_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("s3://")?;
    let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
    (!bucket.is_empty()).then_some((bucket, key))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3Object {
    pub key: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub last_modified: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListObjectsResponse {
    #[serde(default)]
    contents: Vec<S3Object>,
}

#[derive(Clone)]
pub struct S3Client {
    cli: AwsCli,
}

impl S3Client {
    pub fn new(cli: AwsCli) -> Self {
        Self { cli }
    }

    /// Upload a local file to `s3://bucket/key`.
    pub async fn put_file(&self, local_path: &Path, bucket: &str, key: &str) -> AwsResult<String> {
        let uri = s3_uri(bucket, key);
        let local = local_path.to_string_lossy();
        self.cli.call(&["s3", "cp", &local, &uri, "--only-show-errors"]).await?;
        info!(local = %local, %uri, "uploaded");
        Ok(uri)
    }

    /// Whether `s3://bucket/key` exists. Access errors are propagated.
    pub async fn object_exists(&self, bucket: &str, key: &str) -> AwsResult<bool> {
        match self.cli.call(&["s3api", "head-object", "--bucket", bucket, "--key", key]).await {
            Ok(_) => Ok(true),
            Err(AwsError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn list_prefix(&self, bucket: &str, prefix: &str) -> AwsResult<Vec<S3Object>> {
        let response: ListObjectsResponse =
            self.cli.call_json(&["s3api", "list-objects-v2", "--bucket", bucket, "--prefix", prefix]).await?;
        Ok(response.contents)
    }
}

#[async_trait]
impl ImageUploader for S3Client {
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> TrainingResult<String> {
        self.put_file(local_path, bucket, key).await.map_err(|e| TrainingError::Upload(e.to_string()))
    }
}
