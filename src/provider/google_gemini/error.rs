use std::time::Duration;

use serde::Deserialize;

use crate::error::{ChatError, classify_status};

use super::PROVIDER_ID;

/// Turns a non-2xx Gemini response into a [`ChatError`].
///
/// Gemini wraps failures as `{"error": {"code", "message", "status"}}`; the RPC status
/// (`INVALID_ARGUMENT`, `RESOURCE_EXHAUSTED`, ...) is appended to the message.
pub(crate) fn parse_gemini_error(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> ChatError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }
    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        status: Option<String>,
    }

    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error: Some(error) }) => {
            let message = error.message.unwrap_or_else(|| "unknown error".to_string());
            match error.status.filter(|status| !status.is_empty()) {
                Some(rpc_status) => format!("{message} ({rpc_status})"),
                None => message,
            }
        }
        _ => format!("status {status}: {body}"),
    };
    classify_status(PROVIDER_ID, status, message, retry_after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_key_maps_to_validation_with_rpc_status() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        match parse_gemini_error(400, body, None) {
            ChatError::Validation { message } => {
                assert_eq!(
                    message,
                    "API key not valid. Please pass a valid API key. (INVALID_ARGUMENT)"
                );
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn resource_exhausted_is_rate_limited() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            parse_gemini_error(429, body, Some(Duration::from_secs(30))),
            ChatError::RateLimit {
                retry_after: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn unknown_model_is_a_provider_error() {
        let body = r#"{"error":{"code":404,"message":"models/gemini-9 is not found","status":"NOT_FOUND"}}"#;
        match parse_gemini_error(404, body, None) {
            ChatError::Provider { provider, message } => {
                assert_eq!(provider, "google_gemini");
                assert!(message.contains("NOT_FOUND"));
            }
            other => panic!("expected Provider, got {other:?}"),
        }
    }
}
