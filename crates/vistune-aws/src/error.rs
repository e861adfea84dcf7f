use std::time::Duration;
use thiserror::Error;
use vistune_training::TrainingError;

/// Errors from invoking the `aws` command-line tool.
#[derive(Debug, Error)]
pub enum AwsError {
    #[error("AWS CLI not found at '{0}'. Install awscli or set AWS_CLI_PATH.")]
    CliNotFound(String),

    #[error("AWS access denied: {0}")]
    AccessDenied(String),

    #[error("AWS resource not found: {0}")]
    NotFound(String),

    /// Keeps the service error name in the message so labels written from it
    /// carry the throttling marker.
    #[error("ThrottlingException: {0}")]
    Throttled(String),

    #[error("AWS request rejected: {0}")]
    Validation(String),

    #[error("AWS command timed out after {0:?}")]
    Timeout(Duration),

    #[error("AWS command failed: {0}")]
    CommandFailed(String),

    #[error("failed to parse AWS response: {0}")]
    ParseError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AwsError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CliNotFound(_) => "CLI_NOT_FOUND",
            Self::AccessDenied(_) => "ACCESS_DENIED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Throttled(_) => "THROTTLED",
            Self::Validation(_) => "VALIDATION",
            Self::Timeout(_) => "TIMEOUT",
            Self::CommandFailed(_) => "COMMAND_FAILED",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// Classify a failed invocation from its stderr.
    pub fn from_stderr(stderr: &str) -> Self {
        let message = stderr.trim().to_string();
        if stderr.contains("ThrottlingException") || stderr.contains("TooManyRequests") {
            Self::Throttled(message)
        } else if stderr.contains("AccessDenied")
            || stderr.contains("UnauthorizedOperation")
            || stderr.contains("ExpiredToken")
            || stderr.contains("Unable to locate credentials")
        {
            Self::AccessDenied(message)
        } else if stderr.contains("Not Found")
            || stderr.contains("(404)")
            || stderr.contains("NoSuchKey")
            || stderr.contains("NoSuchBucket")
            || stderr.contains("ResourceNotFoundException")
        {
            Self::NotFound(message)
        } else if stderr.contains("ValidationException") {
            Self::Validation(message)
        } else {
            Self::CommandFailed(message)
        }
    }
}

pub type AwsResult<T> = std::result::Result<T, AwsError>;

impl From<AwsError> for TrainingError {
    fn from(e: AwsError) -> Self {
        Self::Other(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_stderr() {
        let e = AwsError::from_stderr(
            "An error occurred (ThrottlingException) when calling the Converse operation: Too many requests",
        );
        assert_eq!(e.error_code(), "THROTTLED");
        assert!(e.to_string().contains("ThrottlingException"));

        let e = AwsError::from_stderr("An error occurred (404) when calling the HeadObject operation: Not Found");
        assert_eq!(e.error_code(), "NOT_FOUND");

        let e = AwsError::from_stderr("An error occurred (AccessDenied) when calling the PutObject operation");
        assert_eq!(e.error_code(), "ACCESS_DENIED");

        let e = AwsError::from_stderr("An error occurred (ValidationException): bad role");
        assert_eq!(e.error_code(), "VALIDATION");

        assert_eq!(AwsError::from_stderr("boom").error_code(), "COMMAND_FAILED");
    }
}
