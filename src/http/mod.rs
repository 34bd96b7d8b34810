use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;
use serde::Serialize;

use crate::error::ChatError;

pub mod reqwest;

/// JSON POST request handed to an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Builds a POST request carrying a serialized JSON body.
    ///
    /// # Examples
    ///
    /// ```
    /// use chat_adapter::http::HttpRequest;
    ///
    /// let request = HttpRequest::post_json("https://example.com", br"{}".to_vec());
    /// assert_eq!(request.headers.get("Content-Type"), Some(&"application/json".to_string()));
    /// assert!(request.timeout.is_none());
    /// ```
    pub fn post_json(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body,
            timeout: None,
        }
    }

    /// Adds headers on top of the JSON content type.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Transport`] when the payload is not valid UTF-8.
    pub fn text(&self) -> Result<String, ChatError> {
        String::from_utf8(self.body.clone()).map_err(|err| ChatError::transport(err.to_string()))
    }

    /// Decodes the body, replacing invalid UTF-8 sequences. Used for error payloads.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP response whose body arrives incrementally.
pub struct HttpStreamResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: HttpBodyStream,
}

/// Body stream returned by [`HttpTransport::send_stream`].
pub type HttpBodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ChatError>> + Send>>;

/// Decouples providers from the concrete HTTP client.
///
/// Tests plug in-memory implementations here; production code uses
/// [`reqwest::ReqwestTransport`].
///
/// # Examples
///
/// ```
/// # use async_trait::async_trait;
/// # use chat_adapter::http::{HttpTransport, HttpRequest, HttpResponse, HttpStreamResponse};
/// # use chat_adapter::error::ChatError;
/// # use futures_util::stream;
/// struct EchoTransport;
///
/// #[async_trait]
/// impl HttpTransport for EchoTransport {
///     async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ChatError> {
///         Ok(HttpResponse { status: 200, headers: request.headers, body: request.body })
///     }
///     async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, ChatError> {
///         let body = request.body;
///         Ok(HttpStreamResponse {
///             status: 200,
///             headers: request.headers,
///             body: Box::pin(stream::once(async move { Ok(body) })),
///         })
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let response = EchoTransport
///     .send(HttpRequest::post_json("https://example.com", b"ping".to_vec()))
///     .await
///     .unwrap();
/// assert_eq!(response.body, b"ping");
/// # });
/// ```
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and resolves once the whole body has been read.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ChatError>;

    /// Sends a request and returns as soon as the headers are available.
    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, ChatError>;
}

/// Shared transport handle.
pub type DynHttpTransport = Arc<dyn HttpTransport>;

fn encode_body<T: Serialize>(body: &T) -> Result<Vec<u8>, ChatError> {
    serde_json::to_vec(body).map_err(|err| ChatError::Validation {
        message: format!("failed to serialize request: {err}"),
    })
}

/// Serializes `body`, attaches `headers`, and sends a buffered POST.
///
/// # Errors
///
/// Returns [`ChatError::Validation`] if serialization fails, otherwise whatever the
/// transport reports.
pub async fn post_json<T: Serialize>(
    transport: &dyn HttpTransport,
    url: impl Into<String>,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
    body: &T,
) -> Result<HttpResponse, ChatError> {
    let request = HttpRequest::post_json(url, encode_body(body)?)
        .with_headers(headers)
        .with_timeout(timeout);
    transport.send(request).await
}

/// Streaming counterpart of [`post_json`].
pub async fn post_json_stream<T: Serialize>(
    transport: &dyn HttpTransport,
    url: impl Into<String>,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
    body: &T,
) -> Result<HttpStreamResponse, ChatError> {
    let request = HttpRequest::post_json(url, encode_body(body)?)
        .with_headers(headers)
        .with_timeout(timeout);
    transport.send_stream(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser;

    struct PanicTransport;

    #[async_trait]
    impl HttpTransport for PanicTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, ChatError> {
            panic!("send should not be called");
        }

        async fn send_stream(&self, _request: HttpRequest) -> Result<HttpStreamResponse, ChatError> {
            panic!("send_stream should not be called");
        }
    }

    struct NonSerializableBody;

    impl Serialize for NonSerializableBody {
        fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            Err(ser::Error::custom("intentional serialization failure"))
        }
    }

    #[tokio::test]
    async fn post_json_rejects_unserializable_body_before_sending() {
        let result = post_json(
            &PanicTransport,
            "http://example.com",
            HashMap::new(),
            None,
            &NonSerializableBody,
        )
        .await;

        match result {
            Err(ChatError::Validation { message }) => {
                assert!(message.contains("failed to serialize request"), "{message}");
            }
            Ok(_) => panic!("expected validation error"),
            Err(other) => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn text_lossy_keeps_readable_parts_of_invalid_utf8() {
        let response = HttpResponse {
            status: 502,
            headers: HashMap::new(),
            body: b"bad gateway \xfe".to_vec(),
        };
        assert!(response.text().is_err());
        assert_eq!(response.text_lossy(), "bad gateway \u{fffd}");
    }

    #[test]
    fn with_headers_keeps_content_type() {
        let request = HttpRequest::post_json("http://example.com", Vec::new())
            .with_headers(HashMap::from([("Authorization".into(), "Bearer k".into())]))
            .with_timeout(Some(Duration::from_secs(1)));
        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.timeout, Some(Duration::from_secs(1)));
    }
}
