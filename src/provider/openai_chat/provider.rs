use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ChatError;
use crate::http::{DynHttpTransport, post_json, post_json_stream};
use crate::provider::{
    AsyncChatProvider, BlockingRuntime, ChatProvider, DeltaStream, ProviderReply,
    ProviderRequest, ProviderUsage, ReplyChoice, retry_after_from_headers,
};
use crate::stream::collect_body_text;

use super::PROVIDER_ID;
use super::error::parse_openai_error;
use super::stream::create_stream;
use super::types::{OpenAiChatRequest, OpenAiChatResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// 兼容 OpenAI `/chat/completions` 端点的 Provider
pub struct OpenAiChatProvider {
    transport: DynHttpTransport,
    base_url: String,
    api_key: String,
    timeout: Option<Duration>,
    blocking: BlockingRuntime,
}

impl OpenAiChatProvider {
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: None,
            blocking: BlockingRuntime::new(),
        }
    }

    /// 指向代理或其他兼容 OpenAI 的服务
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.api_key),
            ),
            ("Accept".to_string(), "application/json".to_string()),
        ])
    }

    fn build_body<'a>(request: &'a ProviderRequest, stream: bool) -> OpenAiChatRequest<'a> {
        OpenAiChatRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.params.temperature,
            max_tokens: request.params.max_tokens,
            frequency_penalty: request.params.frequency_penalty,
            presence_penalty: request.params.presence_penalty,
            stream,
        }
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<ProviderReply, ChatError> {
        let body = Self::build_body(request, false);
        let response = post_json(
            self.transport.as_ref(),
            self.endpoint(),
            self.build_headers(),
            self.timeout,
            &body,
        )
        .await?;

        if !response.is_success() {
            return Err(parse_openai_error(
                response.status,
                &response.text_lossy(),
                retry_after_from_headers(&response.headers),
            ));
        }
        let text = response.text()?;
        tracing::debug!(provider = PROVIDER_ID, body = %text, "received completion");
        let parsed: OpenAiChatResponse = serde_json::from_str(&text).map_err(|err| {
            ChatError::malformed(PROVIDER_ID, format!("failed to parse response: {err}"))
        })?;
        Ok(map_response(parsed))
    }

    async fn open_stream(&self, request: &ProviderRequest) -> Result<DeltaStream, ChatError> {
        let body = Self::build_body(request, true);
        let response = post_json_stream(
            self.transport.as_ref(),
            self.endpoint(),
            self.build_headers(),
            self.timeout,
            &body,
        )
        .await?;

        if !(200..300).contains(&response.status) {
            let retry_after = retry_after_from_headers(&response.headers);
            let text = collect_body_text(response.body).await?;
            return Err(parse_openai_error(response.status, &text, retry_after));
        }
        Ok(create_stream(response.body))
    }
}

fn map_response(mut response: OpenAiChatResponse) -> ProviderReply {
    response.choices.sort_by_key(|choice| choice.index);
    ProviderReply {
        choices: response
            .choices
            .into_iter()
            .map(|choice| ReplyChoice {
                content: choice.message.and_then(|message| message.content),
            })
            .collect(),
        usage: response.usage.map(|usage| ProviderUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }),
    }
}

impl ChatProvider for OpenAiChatProvider {
    fn name(&self) -> &'static str {
        "OpenAiChatProvider"
    }

    fn invoke(&self, request: ProviderRequest) -> Result<ProviderReply, ChatError> {
        self.blocking.block_on(self.complete(&request))?
    }
}

#[async_trait]
impl AsyncChatProvider for OpenAiChatProvider {
    async fn ainvoke(&self, request: ProviderRequest) -> Result<ProviderReply, ChatError> {
        self.complete(&request).await
    }

    async fn stream(&self, request: ProviderRequest) -> Result<DeltaStream, ChatError> {
        self.open_stream(&request).await
    }
}
