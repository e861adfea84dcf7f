use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("label table error: {0}")]
    LabelTable(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("invalid customization job spec: {0}")]
    InvalidJob(String),

    #[error("metrics error: {0}")]
    Metrics(String),

    #[error("upload error: {0}")]
    Upload(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
