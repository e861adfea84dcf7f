//! `vistune.toml` configuration.
//!
//! Values are layered: defaults < config file < environment < CLI flags.
//! Every field is optional so layers can be merged; accessors supply defaults.

use crate::error::{TrainingError, TrainingResult};
use crate::job::HyperParameters;
use crate::labels::LabelColumns;
use crate::record::RecordBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "vistune.toml";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_BASE_MODEL_ID: &str = "arn:aws:bedrock:us-east-1::foundation-model/amazon.nova-lite-v1:0:300k";
pub const DEFAULT_LABELING_MODEL_ID: &str = "us.anthropic.claude-3-7-sonnet-20250219-v1:0";
pub const DEFAULT_LABELING_PROMPT: &str = "这是一张中国增值税发票。请识别并提取出销售方名称。只需要返回销售方名称，不要有其他文字。请确保提取的是销售方（开票方），而不是购买方（收票方）。";
pub const DEFAULT_LABELING_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsSection {
    pub region: Option<String>,
    pub bucket: Option<String>,
    pub account_id: Option<String>,
    pub role_arn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub labels_csv: Option<PathBuf>,
    pub images_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub logs_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Section {
    pub image_prefix: Option<String>,
    pub training_prefix: Option<String>,
    pub output_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSection {
    pub image_column: Option<String>,
    pub label_column: Option<String>,
    pub instruction: Option<String>,
    pub system_prompt: Option<String>,
    pub jpeg_alias: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSection {
    pub base_model_id: Option<String>,
    pub epochs: Option<u32>,
    pub batch_size: Option<u32>,
    pub learning_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingSection {
    pub model_id: Option<String>,
    pub prompt: Option<String>,
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VistuneConfig {
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub aws: AwsSection,
    pub paths: PathsSection,
    pub s3: S3Section,
    pub dataset: DatasetSection,
    pub job: JobSection,
    pub labeling: LabelingSection,
}

/// Overwrite `dst` when `src` is set.
fn take<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
    if src.is_some() {
        dst.clone_from(src);
    }
}

impl VistuneConfig {
    pub fn load_from_file(path: &Path) -> TrainingResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TrainingError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content).map_err(|e| TrainingError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save_to_file(&self, path: &Path) -> TrainingResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TrainingError::Config(format!("failed to serialize: {e}")))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load `explicit` if given (it must exist), else `./vistune.toml` when present,
    /// else defaults. Environment overrides are applied on top.
    pub fn discover(explicit: Option<&Path>) -> TrainingResult<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.is_file() { Self::load_from_file(local)? } else { Self::default() }
            }
        };
        config.apply_env(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
        Ok(config)
    }

    /// Values from `other` override values in `self` when set.
    pub fn merge(&mut self, other: &Self) {
        take(&mut self.log_level, &other.log_level);
        take(&mut self.log_file, &other.log_file);

        take(&mut self.aws.region, &other.aws.region);
        take(&mut self.aws.bucket, &other.aws.bucket);
        take(&mut self.aws.account_id, &other.aws.account_id);
        take(&mut self.aws.role_arn, &other.aws.role_arn);

        take(&mut self.paths.labels_csv, &other.paths.labels_csv);
        take(&mut self.paths.images_dir, &other.paths.images_dir);
        take(&mut self.paths.output_dir, &other.paths.output_dir);
        take(&mut self.paths.logs_dir, &other.paths.logs_dir);

        take(&mut self.s3.image_prefix, &other.s3.image_prefix);
        take(&mut self.s3.training_prefix, &other.s3.training_prefix);
        take(&mut self.s3.output_prefix, &other.s3.output_prefix);

        take(&mut self.dataset.image_column, &other.dataset.image_column);
        take(&mut self.dataset.label_column, &other.dataset.label_column);
        take(&mut self.dataset.instruction, &other.dataset.instruction);
        take(&mut self.dataset.system_prompt, &other.dataset.system_prompt);
        take(&mut self.dataset.jpeg_alias, &other.dataset.jpeg_alias);

        take(&mut self.job.base_model_id, &other.job.base_model_id);
        take(&mut self.job.epochs, &other.job.epochs);
        take(&mut self.job.batch_size, &other.job.batch_size);
        take(&mut self.job.learning_rate, &other.job.learning_rate);

        take(&mut self.labeling.model_id, &other.labeling.model_id);
        take(&mut self.labeling.prompt, &other.labeling.prompt);
        take(&mut self.labeling.batch_size, &other.labeling.batch_size);
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// Unparseable numeric values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |dst: &mut Option<String>, key: &str| {
            if let Some(v) = lookup(key) {
                *dst = Some(v);
            }
        };
        set(&mut self.aws.region, "AWS_REGION");
        set(&mut self.aws.bucket, "S3_BUCKET");
        set(&mut self.aws.account_id, "AWS_ACCOUNT_ID");
        set(&mut self.aws.role_arn, "ROLE_ARN");
        set(&mut self.s3.image_prefix, "S3_PREFIX_IMAGES");
        set(&mut self.s3.training_prefix, "S3_PREFIX_TRAINING");
        set(&mut self.s3.output_prefix, "S3_PREFIX_OUTPUT");
        set(&mut self.job.base_model_id, "BASE_MODEL_ID");

        if let Some(v) = lookup("EPOCH_COUNT").and_then(|v| v.parse().ok()) {
            self.job.epochs = Some(v);
        }
        if let Some(v) = lookup("BATCH_SIZE").and_then(|v| v.parse().ok()) {
            self.job.batch_size = Some(v);
        }
        if let Some(v) = lookup("LEARNING_RATE").and_then(|v| v.parse().ok()) {
            self.job.learning_rate = Some(v);
        }
    }

    pub fn region(&self) -> &str {
        self.aws.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    pub fn require_bucket(&self) -> TrainingResult<&str> {
        self.aws
            .bucket
            .as_deref()
            .ok_or_else(|| TrainingError::Config("S3 bucket is not set ([aws] bucket or S3_BUCKET)".to_string()))
    }

    pub fn require_account_id(&self) -> TrainingResult<&str> {
        self.aws.account_id.as_deref().ok_or_else(|| {
            TrainingError::Config("AWS account id is not set ([aws] account_id or AWS_ACCOUNT_ID)".to_string())
        })
    }

    pub fn output_dir(&self) -> PathBuf {
        self.paths.output_dir.clone().unwrap_or_else(|| PathBuf::from("output"))
    }

    pub fn image_prefix(&self) -> &str {
        self.s3.image_prefix.as_deref().unwrap_or("images")
    }

    pub fn training_prefix(&self) -> &str {
        self.s3.training_prefix.as_deref().unwrap_or("training")
    }

    pub fn output_prefix(&self) -> &str {
        self.s3.output_prefix.as_deref().unwrap_or("output")
    }

    pub fn label_columns(&self) -> LabelColumns {
        let defaults = LabelColumns::default();
        LabelColumns {
            image: self.dataset.image_column.clone().unwrap_or(defaults.image),
            label: self.dataset.label_column.clone().unwrap_or(defaults.label),
        }
    }

    pub fn record_builder(&self) -> RecordBuilder {
        let mut builder = RecordBuilder::new().with_jpeg_alias(self.dataset.jpeg_alias.unwrap_or(false));
        if let Some(prompt) = &self.dataset.system_prompt {
            builder = builder.with_system_prompt(prompt.clone());
        }
        if let Some(instruction) = &self.dataset.instruction {
            builder = builder.with_instruction(instruction.clone());
        }
        builder
    }

    pub fn base_model_id(&self) -> &str {
        self.job.base_model_id.as_deref().unwrap_or(DEFAULT_BASE_MODEL_ID)
    }

    pub fn hyperparameters(&self) -> HyperParameters {
        let defaults = HyperParameters::default();
        HyperParameters {
            epoch_count: self.job.epochs.unwrap_or(defaults.epoch_count),
            batch_size: self.job.batch_size.unwrap_or(defaults.batch_size),
            learning_rate: self.job.learning_rate.unwrap_or(defaults.learning_rate),
        }
    }

    pub fn labeling_model_id(&self) -> &str {
        self.labeling.model_id.as_deref().unwrap_or(DEFAULT_LABELING_MODEL_ID)
    }

    pub fn labeling_prompt(&self) -> &str {
        self.labeling.prompt.as_deref().unwrap_or(DEFAULT_LABELING_PROMPT)
    }

    pub fn labeling_batch_size(&self) -> usize {
        self.labeling.batch_size.filter(|n| *n > 0).unwrap_or(DEFAULT_LABELING_BATCH_SIZE)
    }
}
