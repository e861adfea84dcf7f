//! Bedrock calls: Converse with an inline image, and model customization jobs.

use crate::error::{AwsError, AwsResult};
use crate::runner::AwsCli;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use tracing::info;
use vistune_training::job::{CreateJobRequest, JobStatus};
use vistune_training::record::image_format;
use vistune_training::{LabelModel, TrainingResult};

const MAX_TOKENS: u32 = 1000;

/// Summary of `get-model-customization-job`.
#[derive(Debug, Clone, Serialize)]
pub struct JobDescription {
    pub job_arn: String,
    pub job_name: String,
    pub status: JobStatus,
    pub failure_message: Option<String>,
    pub output_model_arn: Option<String>,
    pub creation_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetJobResponse {
    job_arn: String,
    #[serde(default)]
    job_name: String,
    status: String,
    #[serde(default)]
    failure_message: Option<String>,
    #[serde(default)]
    output_model_arn: Option<String>,
    #[serde(default)]
    creation_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateJobResponse {
    job_arn: String,
}

#[derive(Clone)]
pub struct BedrockClient {
    cli: AwsCli,
    model_id: String,
}

impl BedrockClient {
    /// `model_id` is the model used by [`BedrockClient::converse_image`].
    pub fn new(cli: AwsCli, model_id: impl Into<String>) -> Self {
        Self { cli, model_id: model_id.into() }
    }

    /// Send one image plus a text prompt; return the first text block of the reply.
    pub async fn converse_image(&self, image_path: &Path, prompt: &str) -> AwsResult<String> {
        let bytes = tokio::fs::read(image_path).await?;
        let input = converse_input(&self.model_id, &image_name(image_path), &bytes, prompt);
        let response: Value = self.call_with_input(&["bedrock-runtime", "converse"], &input).await?;
        response_text(&response)
    }

    /// Submit a fine-tuning job; returns the job ARN.
    pub async fn create_customization_job(&self, request: &CreateJobRequest) -> AwsResult<String> {
        let input = serde_json::to_value(request).map_err(|e| AwsError::ParseError(e.to_string()))?;
        let response: CreateJobResponse =
            self.call_with_input(&["bedrock", "create-model-customization-job"], &input).await?;
        info!(job_arn = %response.job_arn, "customization job created");
        Ok(response.job_arn)
    }

    /// `job` is a job ARN or name.
    pub async fn get_customization_job(&self, job: &str) -> AwsResult<JobDescription> {
        let response: GetJobResponse = self
            .cli
            .call_json(&["bedrock", "get-model-customization-job", "--job-identifier", job])
            .await?;
        Ok(JobDescription {
            job_arn: response.job_arn,
            job_name: response.job_name,
            status: JobStatus::parse(&response.status),
            failure_message: response.failure_message,
            output_model_arn: response.output_model_arn,
            creation_time: response.creation_time,
            end_time: response.end_time,
        })
    }

    /// Pass `input` through `--cli-input-json file://...`; inline image payloads
    /// are too large for an argument list.
    async fn call_with_input<T: serde::de::DeserializeOwned>(&self, command: &[&str], input: &Value) -> AwsResult<T> {
        let mut file = tempfile::Builder::new().prefix("vistune-").suffix(".json").tempfile()?;
        serde_json::to_writer(&mut file, input).map_err(|e| AwsError::ParseError(e.to_string()))?;
        file.flush()?;

        let arg = format!("file://{}", file.path().display());
        let mut args = command.to_vec();
        args.extend(["--cli-input-json", arg.as_str()]);
        self.cli.call_json(&args).await
    }
}

#[async_trait]
impl LabelModel for BedrockClient {
    async fn extract(&self, image_path: &Path, prompt: &str) -> TrainingResult<String> {
        Ok(self.converse_image(image_path, prompt).await?)
    }
}

fn image_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Converse accepts `jpeg`, not `jpg`.
fn converse_format(image_name: &str) -> String {
    match image_format(image_name).as_str() {
        "jpg" | "" => "jpeg".to_string(),
        other => other.to_string(),
    }
}

fn converse_input(model_id: &str, image_name: &str, bytes: &[u8], prompt: &str) -> Value {
    json!({
        "modelId": model_id,
        "messages": [{
            "role": "user",
            "content": [
                { "image": { "format": converse_format(image_name), "source": { "bytes": STANDARD.encode(bytes) } } },
                { "text": prompt }
            ]
        }],
        "inferenceConfig": { "maxTokens": MAX_TOKENS }
    })
}

fn response_text(response: &Value) -> AwsResult<String> {
    response["output"]["message"]["content"]
        .as_array()
        .and_then(|blocks| blocks.iter().find_map(|b| b["text"].as_str()))
        .map(str::to_string)
        .ok_or_else(|| AwsError::ParseError("no text block in Converse response".to_string()))
}
