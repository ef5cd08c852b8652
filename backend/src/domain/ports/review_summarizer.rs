//! Optional text summariser producing descriptive tags.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::rating::SuggestedTag;

define_port_error! {
    /// Errors raised by summariser adapters.
    pub enum SummarizerError {
        /// The summariser is switched off.
        Disabled => service_unavailable, "review summariser is disabled",
        /// The endpoint could not be reached.
        Transport { message: String } => service_unavailable, "summariser unreachable: {message}",
        /// The endpoint returned an error status.
        Rejected { status: u16, message: String } => internal, "summariser rejected request ({status}): {message}",
        /// The response did not contain usable tags.
        Malformed { message: String } => internal, "summariser response malformed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewSummarizer: Send + Sync {
    /// Model identifier when enabled; `None` means disabled.
    fn model(&self) -> Option<String>;

    /// Suggest descriptive tags for a café from its review summaries.
    async fn descriptive_tags(
        &self,
        summaries: &[String],
    ) -> Result<Vec<SuggestedTag>, SummarizerError>;
}

/// Summariser used when AI is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSummarizer;

#[async_trait]
impl ReviewSummarizer for DisabledSummarizer {
    fn model(&self) -> Option<String> {
        None
    }

    async fn descriptive_tags(
        &self,
        _summaries: &[String],
    ) -> Result<Vec<SuggestedTag>, SummarizerError> {
        Err(SummarizerError::disabled())
    }
}
