//! Shared data structures for chat requests and normalized results.
//!
//! Providers speak their own wire formats; everything crossing the adapter boundary is
//! expressed with the types below.

use std::fmt;
use std::pin::Pin;

use futures_core::Stream;
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, ErrorKind};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged text message.
///
/// Order inside a conversation matters: a system message, when present, is expected
/// first.
///
/// # Examples
///
/// ```
/// use chat_adapter::types::{Message, Role};
///
/// let msg = Message::user("What is 2+2?");
/// assert_eq!(msg.role, Role::User);
/// assert_eq!(
///     serde_json::to_value(&msg).unwrap(),
///     serde_json::json!({"role": "user", "content": "What is 2+2?"})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Token accounting for one completion request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub tokens_total: u64,
}

/// Successful completion: the assistant reply and what it cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub message: Message,
    pub token_usage: TokenUsage,
}

/// Failed completion. Only `error` is serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatFailure {
    pub error: String,
    #[serde(skip)]
    pub kind: ErrorKind,
}

impl From<ChatError> for ChatFailure {
    fn from(err: ChatError) -> Self {
        Self {
            kind: err.kind(),
            error: err.to_string(),
        }
    }
}

/// Outcome of a completion call: exactly one of success or failure.
///
/// Serializes to `{"message": .., "token_usage": ..}` or `{"error": ".."}`.
///
/// # Examples
///
/// ```
/// use chat_adapter::error::ChatError;
/// use chat_adapter::types::ChatResult;
///
/// let result = ChatResult::from(Err(ChatError::transport("connection refused")));
/// assert!(result.is_error());
/// assert_eq!(
///     serde_json::to_value(&result).unwrap(),
///     serde_json::json!({"error": "transport error: connection refused"})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChatResult {
    Success(ChatCompletion),
    Failure(ChatFailure),
}

impl ChatResult {
    pub fn is_error(&self) -> bool {
        matches!(self, ChatResult::Failure(_))
    }

    /// Error description, when this is a failure.
    pub fn error(&self) -> Option<&str> {
        match self {
            ChatResult::Failure(failure) => Some(&failure.error),
            ChatResult::Success(_) => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ChatResult::Failure(failure) => Some(failure.kind),
            ChatResult::Success(_) => None,
        }
    }

    /// Assistant message, when this is a success.
    pub fn message(&self) -> Option<&Message> {
        match self {
            ChatResult::Success(completion) => Some(&completion.message),
            ChatResult::Failure(_) => None,
        }
    }

    pub fn token_usage(&self) -> Option<&TokenUsage> {
        match self {
            ChatResult::Success(completion) => Some(&completion.token_usage),
            ChatResult::Failure(_) => None,
        }
    }
}

impl From<Result<ChatCompletion, ChatError>> for ChatResult {
    fn from(result: Result<ChatCompletion, ChatError>) -> Self {
        match result {
            Ok(completion) => ChatResult::Success(completion),
            Err(err) => ChatResult::Failure(err.into()),
        }
    }
}

/// Lazily opened stream of assistant text fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_serializes_to_message_and_usage() {
        let result = ChatResult::Success(ChatCompletion {
            message: Message::assistant("4"),
            token_usage: TokenUsage {
                tokens_input: 10,
                tokens_output: 1,
                tokens_total: 11,
            },
        });
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "message": {"role": "assistant", "content": "4"},
                "token_usage": {"tokens_input": 10, "tokens_output": 1, "tokens_total": 11}
            })
        );
        assert!(result.error().is_none());
        assert_eq!(result.message().map(|m| m.content.as_str()), Some("4"));
    }

    #[test]
    fn failure_keeps_kind_but_serializes_only_error() {
        let result = ChatResult::from(Err(ChatError::malformed("openai_chat", "no choices")));
        assert_eq!(result.error_kind(), Some(ErrorKind::MalformedResponse));
        assert!(result.message().is_none());
        assert!(result.token_usage().is_none());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value.as_object().map(|obj| obj.len()), Some(1));
        assert!(value["error"].as_str().unwrap().contains("no choices"));
    }

    #[test]
    fn role_round_trips_lowercase() {
        let msg: Message = serde_json::from_value(json!({"role": "system", "content": "hi"}))
            .expect("system message");
        assert_eq!(msg, Message::system("hi"));
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
