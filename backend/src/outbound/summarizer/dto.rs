//! Chat-completions request and response DTOs.
//!
//! Only the fields the summariser reads or writes are modelled.

use serde::{Deserialize, Serialize};

use crate::domain::rating::SuggestedTag;

#[derive(Debug, Serialize)]
pub(super) struct ChatRequestDto<'a> {
    pub(super) model: &'a str,
    pub(super) messages: Vec<ChatMessageDto>,
    pub(super) temperature: f32,
    pub(super) response_format: ResponseFormatDto,
}

#[derive(Debug, Serialize)]
pub(super) struct ChatMessageDto {
    pub(super) role: &'static str,
    pub(super) content: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ResponseFormatDto {
    #[serde(rename = "type")]
    pub(super) kind: &'static str,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatResponseDto {
    #[serde(default)]
    pub(super) choices: Vec<ChoiceDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChoiceDto {
    pub(super) message: ChoiceMessageDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChoiceMessageDto {
    pub(super) content: Option<String>,
}

/// JSON object the model is instructed to return.
#[derive(Debug, Deserialize)]
pub(super) struct TagsPayloadDto {
    #[serde(default)]
    pub(super) tags: Vec<SuggestedTag>,
}
