//! Dataset-level checks for the Bedrock converse fine-tuning format.
//!
//! These rules are stricter than [`crate::validate`]: they cover media
//! formats, S3 URI syntax, role alternation and per-model sample bounds, and
//! they collect every problem instead of stopping at the first one.

use crate::error::{TrainingError, TrainingResult};
use crate::jsonl::read_jsonl_values_strict;
use crate::validate::validate_value;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const IMAGE_FORMATS: &[&str] = &["jpeg", "png", "gif", "webp"];
pub const VIDEO_FORMATS: &[&str] = &["mov", "mkv", "mp4", "webm"];
pub const MAX_NUM_IMAGES: usize = 10;

static S3_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w\-/\.]+$").expect("valid S3 path regex"));

/// Model family being fine-tuned; decides sample bounds and media support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Micro,
    Lite,
    Pro,
}

impl ModelFamily {
    /// Inclusive `(min, max)` number of samples accepted for this family.
    pub fn sample_bounds(self) -> (usize, usize) {
        match self {
            Self::Micro | Self::Lite | Self::Pro => (8, 20_000),
        }
    }

    pub fn supports_media(self) -> bool {
        !matches!(self, Self::Micro)
    }

    /// Infer the family from a full model identifier such as `amazon.nova-lite-v1:0`.
    pub fn from_model_id(model_id: &str) -> Option<Self> {
        let id = model_id.to_lowercase();
        [Self::Micro, Self::Lite, Self::Pro].into_iter().find(|f| id.contains(f.as_str()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Micro => "micro",
            Self::Lite => "lite",
            Self::Pro => "pro",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "micro" => Ok(Self::Micro),
            "lite" => Ok(Self::Lite),
            "pro" => Ok(Self::Pro),
            other => Self::from_model_id(other).ok_or_else(|| {
                TrainingError::Dataset(format!("unknown model family '{s}' (expected micro, lite or pro)"))
            }),
        }
    }
}

/// One problem found in a sample. `loc` is a dotted path into the sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub loc: String,
    pub message: String,
}

impl Issue {
    fn new(loc: impl Into<String>, message: impl Into<String>) -> Self {
        Self { loc: loc.into(), message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleFailure {
    /// 0-based sample index.
    pub index: usize,
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetReport {
    pub samples: usize,
    pub bounds_error: Option<String>,
    pub failures: Vec<SampleFailure>,
}

impl DatasetReport {
    pub fn is_valid(&self) -> bool {
        self.bounds_error.is_none() && self.failures.is_empty()
    }

    /// `Problematic samples: [0, 1, ...9]. Sample 0 - loc: message. ...`
    ///
    /// More than three failing samples are abbreviated to the first two and the last.
    pub fn failure_message(&self) -> Option<String> {
        if self.is_valid() {
            return None;
        }

        let mut out = String::new();
        if let Some(bounds) = &self.bounds_error {
            out.push_str(bounds);
            out.push_str(". ");
        }
        if self.failures.is_empty() {
            return Some(out.trim_end().to_string());
        }

        let ids: Vec<usize> = self.failures.iter().map(|f| f.index).collect();
        let listed = if ids.len() > 3 {
            format!("[{}, {}, ...{}]", ids[0], ids[1], ids[ids.len() - 1])
        } else {
            format!("{ids:?}")
        };
        out.push_str(&format!("Problematic samples: {listed}. "));

        for failure in &self.failures {
            out.push_str(&format!("Sample {} - ", failure.index));
            for issue in &failure.issues {
                out.push_str(&format!("{}: {}. ", issue.loc, issue.message));
            }
        }
        Some(out.trim_end().to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConverseOptions {
    pub model: ModelFamily,
    /// Also run the single-record structural checks on every sample.
    pub record_checks: bool,
}

/// Validate a whole `.jsonl` dataset file.
///
/// A wrong extension or malformed JSON line is an error; rule violations are
/// collected into the report.
pub fn validate_dataset_file(path: &Path, options: ConverseOptions) -> TrainingResult<DatasetReport> {
    if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
        return Err(TrainingError::Dataset(format!("File is not jsonl: {}", path.display())));
    }

    let samples = read_jsonl_values_strict(path).map_err(|e| {
        TrainingError::Dataset(format!("Error loading data from {}: {}", path.display(), e))
    })?;
    Ok(validate_samples(&samples, options))
}

pub fn validate_samples(samples: &[Value], options: ConverseOptions) -> DatasetReport {
    let (min, max) = options.model.sample_bounds();
    let bounds_error = (samples.len() < min || samples.len() > max).then(|| {
        format!(
            "Number of samples {} out of bounds between {} and {} for {}",
            samples.len(),
            min,
            max,
            options.model
        )
    });

    let failures = samples
        .iter()
        .enumerate()
        .filter_map(|(index, sample)| {
            let mut issues = validate_sample(sample, options.model);
            if options.record_checks {
                if let Err(rejection) = validate_value(sample) {
                    issues.push(Issue::new("record", rejection.to_string()));
                }
            }
            (!issues.is_empty()).then_some(SampleFailure { index, issues })
        })
        .collect();

    DatasetReport { samples: samples.len(), bounds_error, failures }
}

/// Collect every converse-format violation in one sample.
pub fn validate_sample(sample: &Value, model: ModelFamily) -> Vec<Issue> {
    let mut issues = Vec::new();

    let Some(obj) = sample.as_object() else {
        issues.push(Issue::new("", "Input should be a valid dictionary"));
        return issues;
    };

    if let Some(version) = obj.get("schemaVersion") {
        if !version.is_null() && !version.is_string() {
            issues.push(Issue::new("schemaVersion", "Input should be a valid string"));
        }
    }

    match obj.get("system") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                if item.get("text").and_then(Value::as_str).is_none() {
                    issues.push(Issue::new(format!("system.{i}.text"), "Field required"));
                }
            }
        }
        Some(_) => issues.push(Issue::new("system", "Input should be a valid list")),
    }

    let Some(messages) = obj.get("messages").and_then(Value::as_array) else {
        issues.push(Issue::new("messages", "Field required"));
        return issues;
    };

    let mut roles = Vec::with_capacity(messages.len());
    for (i, message) in messages.iter().enumerate() {
        roles.push(check_message(message, &format!("messages.{i}"), model, &mut issues));
    }

    if let Some(message) = check_roles_order(&roles) {
        issues.push(Issue::new("messages", message));
    }

    issues
}

/// Check one message, returning its role when it has a string role.
fn check_message(message: &Value, loc: &str, model: ModelFamily, issues: &mut Vec<Issue>) -> Option<String> {
    let role = match message.get("role").and_then(Value::as_str) {
        Some(role) if matches!(role.to_lowercase().as_str(), "user" | "assistant") => Some(role.to_string()),
        Some(_) => {
            issues.push(Issue::new(
                format!("{loc}.role"),
                "Invalid value for role, valid values are ['user', 'assistant']",
            ));
            None
        }
        None => {
            issues.push(Issue::new(format!("{loc}.role"), "Field required"));
            None
        }
    };

    let Some(content) = message.get("content").and_then(Value::as_array) else {
        issues.push(Issue::new(format!("{loc}.content"), "Field required"));
        return role;
    };

    let mut text_len = 0;
    let (mut has_text, mut images, mut videos) = (false, 0usize, 0usize);

    for (i, item) in content.iter().enumerate() {
        let item_loc = format!("{loc}.content.{i}");
        let text = item.get("text").filter(|v| !v.is_null());
        let image = item.get("image").filter(|v| !v.is_null());
        let video = item.get("video").filter(|v| !v.is_null());

        if text.is_none() && image.is_none() && video.is_none() {
            issues.push(Issue::new(
                item_loc.clone(),
                "Invalid content, at least one of ['text', 'image', 'video'] must be provided",
            ));
        }
        if let Some(text) = text {
            has_text = true;
            match text.as_str() {
                Some(t) => text_len += t.chars().count(),
                None => issues.push(Issue::new(format!("{item_loc}.text"), "Input should be a valid string")),
            }
        }
        if let Some(image) = image {
            images += 1;
            check_media(image, &format!("{item_loc}.image"), IMAGE_FORMATS, "image", issues);
        }
        if let Some(video) = video {
            videos += 1;
            check_media(video, &format!("{item_loc}.video"), VIDEO_FORMATS, "video", issues);
        }
    }

    let content_loc = format!("{loc}.content");
    let has_media = images > 0 || videos > 0;

    if has_text && !has_media && text_len == 0 {
        issues.push(Issue::new(content_loc.clone(), "Invalid content, empty text content"));
    }
    if has_media && !model.supports_media() {
        issues.push(Issue::new(
            content_loc.clone(),
            "Invalid content, image/video samples not supported by Nova Micro model",
        ));
    }
    if videos > 1 {
        issues.push(Issue::new(content_loc.clone(), "Only one video is allowed per sample"));
    }
    if videos > 0 && images > 0 {
        issues.push(Issue::new(
            content_loc.clone(),
            "'content' list cannot contain both video items and image items for a given sample",
        ));
    }
    if images > MAX_NUM_IMAGES {
        issues.push(Issue::new(
            content_loc,
            format!("Invalid content, number of images {images} exceed maximum allowed limit of {MAX_NUM_IMAGES}"),
        ));
    }
    if has_media && role.as_deref().is_some_and(|r| r.eq_ignore_ascii_case("assistant")) {
        issues.push(Issue::new(
            loc.to_string(),
            "Invalid content, image/video cannot be included when role is 'assistant'",
        ));
    }

    role
}

fn check_media(media: &Value, loc: &str, formats: &[&str], kind: &str, issues: &mut Vec<Issue>) {
    match media.get("format").and_then(Value::as_str) {
        Some(format) if formats.contains(&format.to_lowercase().as_str()) => {}
        Some(_) => issues.push(Issue::new(
            format!("{loc}.format"),
            format!("Invalid {kind} format, supported formats are {formats:?}"),
        )),
        None => issues.push(Issue::new(format!("{loc}.format"), "Field required")),
    }

    let uri_loc = format!("{loc}.source.s3Location.uri");
    match media.get("source").and_then(|s| s.get("s3Location")).and_then(|l| l.get("uri")).and_then(Value::as_str) {
        Some(uri) => {
            if let Err(message) = check_s3_uri(uri) {
                issues.push(Issue::new(uri_loc, message));
            }
        }
        None => issues.push(Issue::new(uri_loc, "Field required")),
    }
}

/// An S3 URI must use the `s3://` scheme and a conservative character set.
pub fn check_s3_uri(uri: &str) -> Result<(), String> {
    let Some(path) = uri.strip_prefix("s3://") else {
        return Err("Invalid S3 URI, must start with 's3://'".to_string());
    };
    if !S3_PATH.is_match(path) {
        return Err(
            "Invalid characters in 'uri'. Only alphanumeric, underscores, hyphens, slashes, and dots are allowed"
                .to_string(),
        );
    }
    Ok(())
}

/// Roles must alternate user/assistant, starting with user and ending with assistant.
fn check_roles_order(roles: &[Option<String>]) -> Option<String> {
    if roles.len() < 2 {
        return Some("Invalid messages, both ['user', 'assistant'] are needed in sample".to_string());
    }

    for (i, role) in roles.iter().enumerate() {
        let expected = if i % 2 == 0 { "user" } else { "assistant" };
        if role.as_deref() != Some(expected) {
            return Some(format!(
                "Invalid messages, expected {expected} role but found {}",
                role.as_deref().unwrap_or("none")
            ));
        }
    }

    if roles.last().and_then(Option::as_deref) != Some("assistant") {
        return Some("Invalid messages, last turn should have assistant role".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordBuilder;
    use serde_json::json;

    fn sample(format: &str, uri: &str) -> Value {
        let record = RecordBuilder::new().build(&format!("a.{format}"), "ACME", uri, "1");
        serde_json::to_value(record).unwrap()
    }

    fn lite() -> ConverseOptions {
        ConverseOptions { model: ModelFamily::Lite, record_checks: true }
    }

    #[test]
    fn test_model_family_parsing() {
        assert_eq!("lite".parse::<ModelFamily>().unwrap(), ModelFamily::Lite);
        assert_eq!("amazon.nova-pro-v1:0".parse::<ModelFamily>().unwrap(), ModelFamily::Pro);
        assert!("sonnet".parse::<ModelFamily>().is_err());
    }

    #[test]
    fn test_good_sample_has_no_issues() {
        assert!(validate_sample(&sample("png", "s3://bucket/images/a.png"), ModelFamily::Lite).is_empty());
    }

    #[test]
    fn test_jpg_format_is_rejected() {
        let issues = validate_sample(&sample("jpg", "s3://bucket/a.jpg"), ModelFamily::Lite);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].loc, "messages.0.content.1.image.format");
    }

    #[test]
    fn test_uri_rules() {
        assert!(check_s3_uri("s3://bucket/key_1-2.png").is_ok());
        assert!(check_s3_uri("bucket/key.png").unwrap_err().contains("s3://"));
        assert!(check_s3_uri("s3://bucket/has space.png").unwrap_err().contains("Invalid characters"));
    }

    #[test]
    fn test_micro_rejects_media() {
        let issues = validate_sample(&sample("png", "s3://b/a.png"), ModelFamily::Micro);
        assert!(issues.iter().any(|i| i.message.contains("not supported by Nova Micro")));
    }

    #[test]
    fn test_role_order() {
        let value = json!({
            "messages": [
                {"role": "assistant", "content": [{"text": "hi"}]},
                {"role": "user", "content": [{"text": "hello"}]}
            ]
        });
        let issues = validate_sample(&value, ModelFamily::Lite);
        assert!(issues.iter().any(|i| i.message == "Invalid messages, expected user role but found assistant"));

        let value = json!({"messages": [{"role": "user", "content": [{"text": "only"}]}]});
        let issues = validate_sample(&value, ModelFamily::Lite);
        assert!(issues.iter().any(|i| i.message.contains("both ['user', 'assistant']")));
    }

    #[test]
    fn test_content_rules() {
        let value = json!({
            "messages": [
                {"role": "user", "content": [{}, {"text": ""}]},
                {"role": "assistant", "content": [{"image": {"format": "png", "source": {"s3Location": {"uri": "s3://b/a.png"}}}}]}
            ]
        });
        let messages: Vec<String> = validate_sample(&value, ModelFamily::Lite).into_iter().map(|i| i.message).collect();
        assert!(messages.iter().any(|m| m.contains("at least one of")));
        assert!(messages.iter().any(|m| m == "Invalid content, empty text content"));
        assert!(messages.iter().any(|m| m.contains("role is 'assistant'")));
    }

    #[test]
    fn test_too_many_images_and_mixed_media() {
        let image = json!({"image": {"format": "png", "source": {"s3Location": {"uri": "s3://b/a.png"}}}});
        let video = json!({"video": {"format": "mp4", "source": {"s3Location": {"uri": "s3://b/a.mp4"}}}});
        let mut content = vec![image; 11];
        content.push(video);
        let value = json!({
            "messages": [
                {"role": "user", "content": content},
                {"role": "assistant", "content": [{"text": "x"}]}
            ]
        });
        let messages: Vec<String> = validate_sample(&value, ModelFamily::Pro).into_iter().map(|i| i.message).collect();
        assert!(messages.iter().any(|m| m.contains("number of images 11")));
        assert!(messages.iter().any(|m| m.contains("both video items and image items")));
    }

    #[test]
    fn test_bounds_and_failure_message() {
        let samples: Vec<Value> = (0..5).map(|_| sample("jpg", "b/a.jpg")).collect();
        let report = validate_samples(&samples, lite());

        assert!(!report.is_valid());
        assert!(report.bounds_error.as_deref().unwrap().contains("out of bounds between 8 and 20000"));
        assert_eq!(report.failures.len(), 5);

        let message = report.failure_message().unwrap();
        assert!(message.contains("Problematic samples: [0, 1, ...4]."));
        assert!(message.contains("Sample 3 - "));
    }

    #[test]
    fn test_blank_line_in_dataset_is_rejected() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("train_data.jsonl");
        let line = serde_json::to_string(&sample("png", "s3://b/a.png")).unwrap();
        let mut lines = vec![line; 8];
        lines.insert(4, String::new());
        std::fs::write(&path, format!("{}\n", lines.join("\n"))).unwrap();

        let err = validate_dataset_file(&path, lite()).unwrap_err();
        assert!(err.to_string().contains("Line 5: invalid JSON syntax"));

        lines.remove(4);
        std::fs::write(&path, format!("{}\n", lines.join("\n"))).unwrap();
        let report = validate_dataset_file(&path, lite()).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.samples, 8);
    }

    #[test]
    fn test_record_checks_flag_single_record_rules() {
        let mut value = sample("png", "s3://b/a.png");
        value["schemaVersion"] = json!("wrong-version");
        let samples = vec![value; 8];

        let report = validate_samples(&samples, lite());
        assert_eq!(report.failures[0].issues, vec![Issue::new("record", "invalid schema version")]);

        let report = validate_samples(&samples, ConverseOptions { record_checks: false, ..lite() });
        assert!(report.is_valid());
    }
}
