//! OpenAI-compatible Chat Completions provider.

mod error;
mod provider;
mod stream;
mod types;

pub use provider::{DEFAULT_BASE_URL, OpenAiChatProvider};

pub(crate) const PROVIDER_ID: &str = "openai_chat";
