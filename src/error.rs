use std::time::Duration;

use thiserror::Error;

/// Every failure mode surfaced by the chat adapters.
///
/// Construction-time problems come back as [`ChatError::Configuration`]. Call-time errors
/// are flattened into [`crate::types::ChatResult::Failure`] by the adapters, but the typed
/// value stays reachable through the `try_*` entry points and [`ChatError::kind`].
#[derive(Debug, Error)]
pub enum ChatError {
    /// A configuration field is missing or invalid.
    #[error("invalid configuration for {field}: {reason}")]
    Configuration {
        /// Name of the offending field or environment variable.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
    /// Network or HTTP client failure.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The request did not complete within the configured timeout.
    #[error("request timed out: {message}")]
    Timeout { message: String },
    /// Invalid or missing credentials reported by the provider.
    #[error("auth failure: {message}")]
    Auth { message: String },
    /// The provider throttled the request.
    #[error("rate limited: {message}")]
    RateLimit {
        message: String,
        /// Wait suggested by the provider through `Retry-After`.
        retry_after: Option<Duration>,
    },
    /// The provider rejected the request payload.
    #[error("invalid request: {message}")]
    Validation { message: String },
    /// The provider answered 2xx but the payload lacks what the adapter needs.
    #[error("malformed {provider} response: {message}")]
    MalformedResponse {
        provider: &'static str,
        message: String,
    },
    /// Provider-reported failure that fits no other variant.
    #[error("provider {provider} error: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },
    /// The selected client only supports blocking calls.
    #[error("{client} does not support async calls")]
    AsyncUnsupported { client: &'static str },
    /// Failure while reading an already opened stream.
    #[error("{provider} stream error: {message}")]
    Stream {
        provider: &'static str,
        message: String,
    },
}

/// Coarse classification of a [`ChatError`], kept on failure results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Network,
    MalformedResponse,
    Provider,
    Unsupported,
    Stream,
}

impl ChatError {
    /// Creates a [`ChatError::Transport`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use chat_adapter::error::ChatError;
    ///
    /// let err = ChatError::transport("connection reset");
    /// assert!(matches!(err, ChatError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a [`ChatError::Configuration`] for the given field.
    pub fn config<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a [`ChatError::MalformedResponse`].
    pub fn malformed<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::MalformedResponse {
            provider,
            message: message.into(),
        }
    }

    /// Returns the coarse category of this error.
    ///
    /// ```
    /// use chat_adapter::error::{ChatError, ErrorKind};
    ///
    /// let err = ChatError::AsyncUnsupported { client: "StubClient" };
    /// assert_eq!(err.kind(), ErrorKind::Unsupported);
    /// assert_eq!(err.to_string(), "StubClient does not support async calls");
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Transport { .. } | Self::Timeout { .. } => ErrorKind::Network,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::Auth { .. }
            | Self::RateLimit { .. }
            | Self::Validation { .. }
            | Self::Provider { .. } => ErrorKind::Provider,
            Self::AsyncUnsupported { .. } => ErrorKind::Unsupported,
            Self::Stream { .. } => ErrorKind::Stream,
        }
    }
}

/// Maps an HTTP status plus the provider's extracted message onto a [`ChatError`].
pub(crate) fn classify_status(
    provider: &'static str,
    status: u16,
    message: String,
    retry_after: Option<Duration>,
) -> ChatError {
    match status {
        401 | 403 => ChatError::Auth { message },
        429 => ChatError::RateLimit {
            message,
            retry_after,
        },
        400 | 422 => ChatError::Validation { message },
        408 | 504 => ChatError::Timeout { message },
        _ => ChatError::Provider { provider, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_status_maps_common_codes() {
        assert!(matches!(
            classify_status("p", 401, "bad key".into(), None),
            ChatError::Auth { .. }
        ));
        match classify_status("p", 429, "slow down".into(), Some(Duration::from_secs(3))) {
            ChatError::RateLimit { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(3)))
            }
            other => panic!("expected RateLimit, got {other:?}"),
        }
        assert!(matches!(
            classify_status("p", 400, "bad".into(), None),
            ChatError::Validation { .. }
        ));
        match classify_status("openai_chat", 503, "overloaded".into(), None) {
            ChatError::Provider { provider, message } => {
                assert_eq!(provider, "openai_chat");
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected Provider, got {other:?}"),
        }
    }

    #[test]
    fn kinds_separate_network_from_provider_failures() {
        assert_eq!(ChatError::transport("dns").kind(), ErrorKind::Network);
        assert_eq!(
            ChatError::malformed("openai_chat", "no choices").kind(),
            ErrorKind::MalformedResponse
        );
        assert_eq!(
            ChatError::Auth {
                message: "nope".into()
            }
            .kind(),
            ErrorKind::Provider
        );
        assert_eq!(
            ChatError::config("LLM_API_KEY", "is not set").kind(),
            ErrorKind::Configuration
        );
    }
}
