use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ChatError;
use crate::http::{DynHttpTransport, HttpStreamResponse, post_json, post_json_stream};
use crate::provider::{
    AsyncChatProvider, BlockingRuntime, ChatProvider, DeltaStream, ProviderReply,
    ProviderRequest, retry_after_from_headers,
};
use crate::stream::collect_body_text;

use super::PROVIDER_ID;
use super::error::parse_gemini_error;
use super::request::build_gemini_body;
use super::response::map_response;
use super::stream::create_stream;
use super::types::GeminiGenerateContentResponse;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Client for the Gemini `generateContent` endpoints.
pub struct GoogleGeminiProvider {
    transport: DynHttpTransport,
    base_url: String,
    api_key: String,
    timeout: Option<Duration>,
    blocking: BlockingRuntime,
}

impl GoogleGeminiProvider {
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: None,
            blocking: BlockingRuntime::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn endpoint(&self, model: &str) -> String {
        self.method_url(model, "generateContent")
    }

    pub(crate) fn stream_endpoint(&self, model: &str) -> String {
        self.method_url(model, "streamGenerateContent?alt=sse")
    }

    fn method_url(&self, model: &str, method: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let model_path = normalize_model(model);
        if base.ends_with("/v1beta") {
            format!("{base}/{model_path}:{method}")
        } else {
            format!("{base}/v1beta/{model_path}:{method}")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            ("x-goog-api-key".to_string(), self.api_key.clone()),
            ("Accept".to_string(), "application/json".to_string()),
        ])
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<ProviderReply, ChatError> {
        let body = build_gemini_body(request)?;
        let response = post_json(
            self.transport.as_ref(),
            self.endpoint(&request.model),
            self.build_headers(),
            self.timeout,
            &body,
        )
        .await?;

        if !response.is_success() {
            return Err(parse_gemini_error(
                response.status,
                &response.text_lossy(),
                retry_after_from_headers(&response.headers),
            ));
        }
        let text = response.text()?;
        tracing::debug!(provider = PROVIDER_ID, body = %text, "received completion");
        let parsed: GeminiGenerateContentResponse = serde_json::from_str(&text).map_err(|err| {
            ChatError::malformed(PROVIDER_ID, format!("failed to parse response: {err}"))
        })?;
        Ok(map_response(parsed))
    }

    async fn open_stream(&self, request: &ProviderRequest) -> Result<DeltaStream, ChatError> {
        let payload = build_gemini_body(request)?;
        let HttpStreamResponse {
            status,
            headers,
            body,
        } = post_json_stream(
            self.transport.as_ref(),
            self.stream_endpoint(&request.model),
            self.build_headers(),
            self.timeout,
            &payload,
        )
        .await?;

        if !(200..300).contains(&status) {
            let text = collect_body_text(body).await?;
            return Err(parse_gemini_error(
                status,
                &text,
                retry_after_from_headers(&headers),
            ));
        }
        Ok(create_stream(body))
    }
}

/// Accepts both `gemini-2.0-flash` and `models/gemini-2.0-flash`.
fn normalize_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

impl ChatProvider for GoogleGeminiProvider {
    fn name(&self) -> &'static str {
        "GoogleGeminiProvider"
    }

    fn invoke(&self, request: ProviderRequest) -> Result<ProviderReply, ChatError> {
        self.blocking.block_on(self.complete(&request))?
    }
}

#[async_trait]
impl AsyncChatProvider for GoogleGeminiProvider {
    async fn ainvoke(&self, request: ProviderRequest) -> Result<ProviderReply, ChatError> {
        self.complete(&request).await
    }

    async fn stream(&self, request: ProviderRequest) -> Result<DeltaStream, ChatError> {
        self.open_stream(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::reqwest::default_dyn_transport;

    fn provider(base_url: Option<&str>) -> GoogleGeminiProvider {
        let provider = GoogleGeminiProvider::new(default_dyn_transport().expect("transport"), "key");
        match base_url {
            Some(url) => provider.with_base_url(url),
            None => provider,
        }
    }

    #[test]
    fn endpoints_prefix_models_and_version() {
        let provider = provider(None);
        assert_eq!(
            provider.endpoint("gemini-2.0-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(
            provider.stream_endpoint("models/gemini-2.0-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn custom_base_with_version_is_not_doubled() {
        assert_eq!(
            provider(Some("http://proxy.local/v1beta/")).endpoint("gemini-pro"),
            "http://proxy.local/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn api_key_travels_in_goog_header() {
        let headers = provider(None).build_headers();
        assert_eq!(headers.get("x-goog-api-key").map(String::as_str), Some("key"));
        assert!(!headers.contains_key("Authorization"));
    }
}
