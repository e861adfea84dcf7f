//! Training record shape for the Bedrock conversation format.
//!
//! One [`TrainingRecord`] is one line of the output dataset: a system prompt,
//! a user turn carrying the instruction and an S3-hosted image, and an
//! assistant turn carrying the expected label.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// The only schema tag the fine-tuning service accepts.
pub const SCHEMA_VERSION: &str = "bedrock-conversation-2024";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a smart assistant that answers questions respectfully";

pub const DEFAULT_INSTRUCTION: &str = "这是一张发票图片。请识别并提取出销售方名称。只需要返回销售方名称，不要有其他文字。请确保提取的是销售方（开票方），而不是购买方（收票方）。";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRecord {
    pub schema_version: String,
    pub system: Vec<SystemPrompt>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPrompt {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

/// A content segment. Serializes as `{"text": ..}` or `{"image": {..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentBlock {
    Text(String),
    Image(ImageBlock),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub format: String,
    pub source: ImageSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "s3Location")]
    pub s3_location: S3Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Location {
    pub uri: String,
    pub bucket_owner: String,
}

impl TrainingRecord {
    /// Serialize as one compact JSON line (no trailing newline).
    ///
    /// Non-ASCII text is written as-is.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// The image segments of the first turn.
    pub fn images(&self) -> impl Iterator<Item = &ImageBlock> {
        self.messages.first().into_iter().flat_map(|m| {
            m.content.iter().filter_map(|block| match block {
                ContentBlock::Image(image) => Some(image),
                ContentBlock::Text(_) => None,
            })
        })
    }

    /// The assistant's label text, if present.
    pub fn label(&self) -> Option<&str> {
        match self.messages.get(1)?.content.first()? {
            ContentBlock::Text(text) => Some(text.as_str()),
            ContentBlock::Image(_) => None,
        }
    }
}

/// Derive the image format tag from a file name: the extension, lower-cased.
///
/// Names without an extension yield an empty tag.
pub fn image_format(image_name: &str) -> String {
    Path::new(image_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Builds [`TrainingRecord`]s with a fixed system prompt and instruction.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    system_prompt: String,
    instruction: String,
    jpeg_alias: bool,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            instruction: DEFAULT_INSTRUCTION.to_string(),
            jpeg_alias: false,
        }
    }
}

impl RecordBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Emit `jpeg` for `.jpg` files. The converse dataset checks only accept `jpeg`.
    #[must_use]
    pub fn with_jpeg_alias(mut self, enabled: bool) -> Self {
        self.jpeg_alias = enabled;
        self
    }

    pub fn build(&self, image_name: &str, label: &str, remote_uri: &str, account_id: &str) -> TrainingRecord {
        let mut format = image_format(image_name);
        if self.jpeg_alias && format == "jpg" {
            format = "jpeg".to_string();
        }

        TrainingRecord {
            schema_version: SCHEMA_VERSION.to_string(),
            system: vec![SystemPrompt { text: self.system_prompt.clone() }],
            messages: vec![
                Message {
                    role: Role::User,
                    content: vec![
                        ContentBlock::Text(self.instruction.clone()),
                        ContentBlock::Image(ImageBlock {
                            format,
                            source: ImageSource {
                                s3_location: S3Location {
                                    uri: remote_uri.to_string(),
                                    bucket_owner: account_id.to_string(),
                                },
                            },
                        }),
                    ],
                },
                Message { role: Role::Assistant, content: vec![ContentBlock::Text(label.to_string())] },
            ],
        }
    }
}

/// Build a record with the default prompts.
pub fn build_record(image_name: &str, label: &str, remote_uri: &str, account_id: &str) -> TrainingRecord {
    RecordBuilder::default().build(image_name, label, remote_uri, account_id)
}
