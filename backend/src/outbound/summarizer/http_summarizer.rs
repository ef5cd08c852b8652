//! Reqwest-backed [`ReviewSummarizer`].
//!
//! Sends the café's review summaries to an OpenAI-compatible
//! `/chat/completions` endpoint and decodes the JSON object the model is
//! asked to return.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode, Url};
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::{ChatMessageDto, ChatRequestDto, ChatResponseDto, ResponseFormatDto, TagsPayloadDto};
use crate::domain::ports::{ReviewSummarizer, SummarizerError};
use crate::domain::rating::{DESCRIPTIVE_TAGS_MAX, SuggestedTag};

/// Most summaries sent in one request.
const MAX_SUMMARIES: usize = 40;
/// Longest summary excerpt sent to the model.
const SUMMARY_EXCERPT_CHARS: usize = 600;

const SYSTEM_PROMPT: &str = "You label cafés from customer reviews. \
Reply with a JSON object {\"tags\": [{\"label\": string, \"score\": number between 0 and 1, \
\"support_count\": number of reviews supporting the label}]}. \
Use short lowercase labels describing drinks, atmosphere or service.";

/// Endpoint, credentials and model.
pub struct SummarizerSettings {
    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub endpoint: Url,
    pub api_key: Zeroizing<String>,
    pub model: String,
    pub timeout: Duration,
}

/// Chat-completions summariser.
pub struct HttpSummarizer {
    client: Client,
    completions_url: Url,
    api_key: Zeroizing<String>,
    model: String,
}

impl HttpSummarizer {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed or the
    /// endpoint cannot be joined with `chat/completions`.
    pub fn new(settings: SummarizerSettings) -> Result<Self, SummarizerError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| SummarizerError::transport(err.to_string()))?;
        let mut base = settings.endpoint;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let completions_url = base
            .join("chat/completions")
            .map_err(|err| SummarizerError::transport(format!("invalid endpoint: {err}")))?;
        Ok(Self {
            client,
            completions_url,
            api_key: settings.api_key,
            model: settings.model,
        })
    }
}

#[async_trait]
impl ReviewSummarizer for HttpSummarizer {
    fn model(&self) -> Option<String> {
        Some(self.model.clone())
    }

    async fn descriptive_tags(
        &self,
        summaries: &[String],
    ) -> Result<Vec<SuggestedTag>, SummarizerError> {
        let request = build_request(&self.model, summaries);
        debug!(model = %self.model, summaries = summaries.len(), "requesting descriptive tags");

        let bearer = Zeroizing::new(format!("Bearer {}", self.api_key.as_str()));
        let response = self
            .client
            .post(self.completions_url.clone())
            .header(AUTHORIZATION, bearer.as_str())
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| SummarizerError::transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| SummarizerError::transport(err.to_string()))?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_tags(body.as_ref())
    }
}

fn build_request<'a>(model: &'a str, summaries: &[String]) -> ChatRequestDto<'a> {
    let reviews = summaries
        .iter()
        .take(MAX_SUMMARIES)
        .enumerate()
        .map(|(index, summary)| {
            let excerpt: String = summary.trim().chars().take(SUMMARY_EXCERPT_CHARS).collect();
            format!("{}. {excerpt}", index + 1)
        })
        .collect::<Vec<_>>()
        .join("\n");
    ChatRequestDto {
        model,
        messages: vec![
            ChatMessageDto {
                role: "system",
                content: SYSTEM_PROMPT.to_owned(),
            },
            ChatMessageDto {
                role: "user",
                content: format!(
                    "Suggest at most {DESCRIPTIVE_TAGS_MAX} tags for this café.\nReviews:\n{reviews}"
                ),
            },
        ],
        temperature: 0.2,
        response_format: ResponseFormatDto {
            kind: "json_object",
        },
    }
}

fn parse_tags(body: &[u8]) -> Result<Vec<SuggestedTag>, SummarizerError> {
    let response: ChatResponseDto = serde_json::from_slice(body)
        .map_err(|err| SummarizerError::malformed(format!("invalid completion payload: {err}")))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| SummarizerError::malformed("completion has no content"))?;
    let payload: TagsPayloadDto = serde_json::from_str(content.trim())
        .map_err(|err| SummarizerError::malformed(format!("content is not a tags object: {err}")))?;
    Ok(payload.tags)
}

fn map_status_error(status: StatusCode, body: &[u8]) -> SummarizerError {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let preview: String = String::from_utf8_lossy(body)
        .chars()
        .take(PREVIEW_CHAR_LIMIT)
        .collect();
    SummarizerError::rejected(status.as_u16(), preview)
}
