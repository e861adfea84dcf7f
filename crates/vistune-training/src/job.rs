use crate::error::{TrainingError, TrainingResult};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_JOB_PREFIX: &str = "invoice-seller-extraction";

/// Default execution role for an account.
pub fn default_role_arn(account_id: &str) -> String {
    format!("arn:aws:iam::{account_id}:role/service-role/AmazonBedrockExecutionRoleForNova")
}

/// `<prefix>-YYYYmmdd-HHMMSS` in local time.
pub fn timestamped_name(prefix: &str, now: DateTime<Local>) -> String {
    format!("{prefix}-{}", now.format("%Y%m%d-%H%M%S"))
}

/// The job id is the last path segment of the job ARN.
pub fn job_id_from_arn(arn: &str) -> &str {
    arn.rsplit('/').next().unwrap_or(arn)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperParameters {
    pub epoch_count: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
}

impl Default for HyperParameters {
    fn default() -> Self {
        Self { epoch_count: 1, batch_size: 1, learning_rate: 0.0001 }
    }
}

impl HyperParameters {
    pub fn validate(&self) -> TrainingResult<()> {
        if self.epoch_count == 0 {
            return Err(TrainingError::InvalidJob("epoch_count must be >= 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(TrainingError::InvalidJob("batch_size must be >= 1".to_string()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(TrainingError::InvalidJob("learning_rate must be > 0".to_string()));
        }
        Ok(())
    }

    /// The service takes every hyperparameter as a string.
    pub fn to_request_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("epochCount".to_string(), self.epoch_count.to_string()),
            ("batchSize".to_string(), self.batch_size.to_string()),
            ("learningRate".to_string(), self.learning_rate.to_string()),
        ])
    }
}

/// Everything needed to submit one fine-tuning job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomizationJobSpec {
    pub job_name: String,
    pub custom_model_name: String,
    pub base_model_id: String,
    pub role_arn: String,
    pub training_data_uri: String,
    pub validation_data_uri: Option<String>,
    pub output_uri: String,
    pub hyperparameters: HyperParameters,
    pub created_at: DateTime<Utc>,
}

impl CustomizationJobSpec {
    pub fn validate(&self) -> TrainingResult<()> {
        validate_resource_name("job_name", &self.job_name)?;
        validate_resource_name("custom_model_name", &self.custom_model_name)?;
        if self.base_model_id.trim().is_empty() {
            return Err(TrainingError::InvalidJob("base_model_id is required".to_string()));
        }
        if !self.role_arn.starts_with("arn:") {
            return Err(TrainingError::InvalidJob(format!("role_arn is not an ARN: {}", self.role_arn)));
        }
        for (field, uri) in [("training_data_uri", &self.training_data_uri), ("output_uri", &self.output_uri)] {
            require_s3_uri(field, uri)?;
        }
        if let Some(uri) = &self.validation_data_uri {
            require_s3_uri("validation_data_uri", uri)?;
        }
        self.hyperparameters.validate()
    }

    /// Request body for `CreateModelCustomizationJob`.
    pub fn to_request(&self) -> CreateJobRequest {
        CreateJobRequest {
            customization_type: "FINE_TUNING".to_string(),
            base_model_identifier: self.base_model_id.clone(),
            job_name: self.job_name.clone(),
            custom_model_name: self.custom_model_name.clone(),
            role_arn: self.role_arn.clone(),
            training_data_config: S3Config { s3_uri: self.training_data_uri.clone() },
            output_data_config: S3Config { s3_uri: self.output_uri.clone() },
            hyper_parameters: self.hyperparameters.to_request_map(),
            validation_data_config: self
                .validation_data_uri
                .as_ref()
                .map(|uri| ValidationDataConfig { validators: vec![S3Config { s3_uri: uri.clone() }] }),
        }
    }
}

fn validate_resource_name(field: &str, name: &str) -> TrainingResult<()> {
    if name.is_empty() || name.len() > 63 {
        return Err(TrainingError::InvalidJob(format!("{field} must be 1-63 characters")));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.')) {
        return Err(TrainingError::InvalidJob(format!("{field} contains invalid characters: {name}")));
    }
    Ok(())
}

fn require_s3_uri(field: &str, uri: &str) -> TrainingResult<()> {
    if uri.strip_prefix("s3://").is_none_or(|rest| rest.is_empty()) {
        return Err(TrainingError::InvalidJob(format!("{field} must be an s3:// URI, got '{uri}'")));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub customization_type: String,
    pub base_model_identifier: String,
    pub job_name: String,
    pub custom_model_name: String,
    pub role_arn: String,
    pub training_data_config: S3Config,
    pub output_data_config: S3Config,
    pub hyper_parameters: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_data_config: Option<ValidationDataConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Config {
    pub s3_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationDataConfig {
    pub validators: Vec<S3Config>,
}

/// Status reported by `GetModelCustomizationJob`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    InProgress,
    Completed,
    Failed,
    Stopping,
    Stopped,
    Unknown(String),
}

impl JobStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "InProgress" => Self::InProgress,
            "Completed" => Self::Completed,
            "Failed" => Self::Failed,
            "Stopping" => Self::Stopping,
            "Stopped" => Self::Stopped,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => f.write_str("InProgress"),
            Self::Completed => f.write_str("Completed"),
            Self::Failed => f.write_str("Failed"),
            Self::Stopping => f.write_str("Stopping"),
            Self::Stopped => f.write_str("Stopped"),
            Self::Unknown(s) => f.write_str(s),
        }
    }
}
