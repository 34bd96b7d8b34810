use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ChatError, classify_status};

use super::PROVIDER_ID;

/// Turns a non-2xx OpenAI response into a [`ChatError`].
pub(crate) fn parse_openai_error(
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
        code: Option<Value>,
    }

    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error: Some(error) }) => {
            let message = error.message.unwrap_or_else(|| "unknown error".to_string());
            match error.code {
                Some(Value::Null) | None => message,
                Some(Value::String(code)) => format!("{message} ({code})"),
                Some(code) => format!("{message} ({code})"),
            }
        }
        _ => format!("status {status}: {body}"),
    };
    classify_status(PROVIDER_ID, status, message, retry_after)
}
