//! Structural checks for a single training record.
//!
//! The checks run against the JSON shape rather than the typed record so the
//! same rules apply to records read back from a `.jsonl` file, where any key
//! may be missing or hold the wrong type. A missing key is a rejection, never
//! a panic.

use crate::record::{SCHEMA_VERSION, TrainingRecord};
use serde_json::Value;
use std::fmt;

/// Why a record was rejected. The first failing check wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    InvalidSchemaVersion,
    MissingSystemPrompt,
    MissingMessages,
    InvalidUserMessage,
    NoImage,
    MultipleImages(usize),
    InvalidImage,
    InvalidAssistantMessage,
    InvalidAssistantResponse,
}

impl Rejection {
    /// Short machine-readable code, used as a counter key.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSchemaVersion => "schema_version",
            Self::MissingSystemPrompt => "system_prompt",
            Self::MissingMessages => "messages",
            Self::InvalidUserMessage => "user_message",
            Self::NoImage => "no_image",
            Self::MultipleImages(_) => "multiple_images",
            Self::InvalidImage => "image_data",
            Self::InvalidAssistantMessage => "assistant_message",
            Self::InvalidAssistantResponse => "assistant_response",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSchemaVersion => f.write_str("invalid schema version"),
            Self::MissingSystemPrompt => f.write_str("missing or invalid system message"),
            Self::MissingMessages => f.write_str("missing or invalid messages"),
            Self::InvalidUserMessage => f.write_str("invalid user message"),
            Self::NoImage => f.write_str("no image found"),
            Self::MultipleImages(n) => write!(f, "expected exactly one image, found {n}"),
            Self::InvalidImage => f.write_str("invalid image data"),
            Self::InvalidAssistantMessage => f.write_str("invalid assistant message"),
            Self::InvalidAssistantResponse => f.write_str("invalid assistant response"),
        }
    }
}

impl std::error::Error for Rejection {}

pub type Verdict = Result<(), Rejection>;

/// Validate a typed record.
pub fn validate_record(record: &TrainingRecord) -> Verdict {
    match serde_json::to_value(record) {
        Ok(value) => validate_value(&value),
        // Unreachable for the derived impls; treated as a shape failure.
        Err(_) => Err(Rejection::MissingMessages),
    }
}

/// Validate an untyped record, e.g. one parsed from a JSONL line.
pub fn validate_value(record: &Value) -> Verdict {
    if record.get("schemaVersion").and_then(Value::as_str) != Some(SCHEMA_VERSION) {
        return Err(Rejection::InvalidSchemaVersion);
    }

    if non_empty_array(record.get("system")).is_none() {
        return Err(Rejection::MissingSystemPrompt);
    }

    let messages = non_empty_array(record.get("messages"))
        .filter(|m| m.len() >= 2)
        .ok_or(Rejection::MissingMessages)?;

    let user = &messages[0];
    let user_content = non_empty_array(user.get("content"))
        .filter(|_| role_is(user, "user"))
        .ok_or(Rejection::InvalidUserMessage)?;
    check_single_image(user_content)?;

    let assistant = &messages[1];
    let assistant_content = non_empty_array(assistant.get("content"))
        .filter(|_| role_is(assistant, "assistant"))
        .ok_or(Rejection::InvalidAssistantMessage)?;
    if non_empty_str(assistant_content[0].get("text")).is_none() {
        return Err(Rejection::InvalidAssistantResponse);
    }

    Ok(())
}

fn check_single_image(content: &[Value]) -> Verdict {
    let images: Vec<&Value> = content.iter().filter_map(|item| item.get("image")).collect();

    let image = match images.as_slice() {
        [] => return Err(Rejection::NoImage),
        [image] => *image,
        many => return Err(Rejection::MultipleImages(many.len())),
    };

    let uri = image.get("source").and_then(|s| s.get("s3Location")).and_then(|l| l.get("uri"));
    if non_empty_str(image.get("format")).is_none() || non_empty_str(uri).is_none() {
        return Err(Rejection::InvalidImage);
    }
    Ok(())
}

fn non_empty_array(value: Option<&Value>) -> Option<&Vec<Value>> {
    value.and_then(Value::as_array).filter(|items| !items.is_empty())
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn role_is(message: &Value, role: &str) -> bool {
    message.get("role").and_then(Value::as_str) == Some(role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{build_record, ContentBlock, Role};
    use serde_json::json;

    fn valid() -> TrainingRecord {
        build_record("inv1.png", "ACME Trading Co", "mybucket/prefix/inv1.png", "111122223333")
    }

    #[test]
    fn test_valid_record_passes() {
        assert_eq!(validate_record(&valid()), Ok(()));
    }

    #[test]
    fn test_wrong_schema_version() {
        let mut record = valid();
        record.schema_version = "wrong-version".to_string();
        let err = validate_record(&record).unwrap_err();
        assert_eq!(err, Rejection::InvalidSchemaVersion);
        assert_eq!(err.to_string(), "invalid schema version");
    }

    #[test]
    fn test_empty_system_prompt() {
        let mut record = valid();
        record.system.clear();
        assert_eq!(validate_record(&record), Err(Rejection::MissingSystemPrompt));
    }

    #[test]
    fn test_single_turn() {
        let mut record = valid();
        record.messages.truncate(1);
        assert_eq!(validate_record(&record), Err(Rejection::MissingMessages));
    }

    #[test]
    fn test_first_turn_must_be_user() {
        let mut record = valid();
        record.messages[0].role = Role::Assistant;
        assert_eq!(validate_record(&record), Err(Rejection::InvalidUserMessage));

        let mut record = valid();
        record.messages[0].content.clear();
        assert_eq!(validate_record(&record), Err(Rejection::InvalidUserMessage));
    }

    #[test]
    fn test_no_image() {
        let mut record = valid();
        record.messages[0].content.retain(|b| matches!(b, ContentBlock::Text(_)));
        let err = validate_record(&record).unwrap_err();
        assert_eq!(err, Rejection::NoImage);
        assert_eq!(err.to_string(), "no image found");
    }

    #[test]
    fn test_two_images() {
        let mut record = valid();
        let image = record.messages[0].content[1].clone();
        record.messages[0].content.push(image);
        assert_eq!(validate_record(&record), Err(Rejection::MultipleImages(2)));
    }

    #[test]
    fn test_image_without_format_or_uri() {
        let record = build_record("README", "ACME", "mybucket/README", "1");
        assert_eq!(validate_record(&record), Err(Rejection::InvalidImage));

        let record = build_record("a.png", "ACME", "", "1");
        assert_eq!(validate_record(&record), Err(Rejection::InvalidImage));
    }

    #[test]
    fn test_second_turn_must_be_assistant() {
        let mut record = valid();
        record.messages[1].role = Role::User;
        assert_eq!(validate_record(&record), Err(Rejection::InvalidAssistantMessage));
    }

    #[test]
    fn test_empty_label() {
        let record = build_record("a.png", "", "b/a.png", "1");
        assert_eq!(validate_record(&record), Err(Rejection::InvalidAssistantResponse));
    }

    #[test]
    fn test_untyped_missing_keys_are_rejections() {
        assert_eq!(validate_value(&json!(null)), Err(Rejection::InvalidSchemaVersion));
        assert_eq!(
            validate_value(&json!({"schemaVersion": SCHEMA_VERSION})),
            Err(Rejection::MissingSystemPrompt)
        );
        assert_eq!(
            validate_value(&json!({"schemaVersion": SCHEMA_VERSION, "system": [{"text": "s"}], "messages": "nope"})),
            Err(Rejection::MissingMessages)
        );
        assert_eq!(
            validate_value(&json!({
                "schemaVersion": SCHEMA_VERSION,
                "system": [{"text": "s"}],
                "messages": [
                    {"role": "user", "content": [{"image": {"format": "png", "source": {}}}]},
                    {"role": "assistant", "content": [{"text": "x"}]}
                ]
            })),
            Err(Rejection::InvalidImage)
        );
        assert_eq!(
            validate_value(&json!({
                "schemaVersion": SCHEMA_VERSION,
                "system": [{"text": "s"}],
                "messages": [
                    {"role": "user", "content": [{"image": {"format": "png", "source": {"s3Location": {"uri": "b/k"}}}}]},
                    {"role": "assistant", "content": [{"image": {}}]}
                ]
            })),
            Err(Rejection::InvalidAssistantResponse)
        );
    }

    #[test]
    fn test_round_trip_through_json_line() {
        let line = valid().to_json_line().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(validate_value(&value), Ok(()));

        let parsed: TrainingRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(validate_record(&parsed), Ok(()));
    }
}
