//! OpenAI-compatible chat-completions client for descriptive tags.

mod dto;
mod http_summarizer;

pub use http_summarizer::{HttpSummarizer, SummarizerSettings};
