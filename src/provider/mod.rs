//! Provider 能力 trait 与内置的 HTTP Provider
//!
//! Provider 要么只支持阻塞调用 ([`ChatProvider`]) 要么同时支持阻塞 异步与流式调用
//! ([`AsyncChatProvider`]) 客户端持有哪一种在构建 [`ProviderHandle`] 时确定

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;

use crate::config::{ChatConfig, ProviderKind};
use crate::error::ChatError;
use crate::http::DynHttpTransport;
use crate::types::Message;

mod blocking;
pub mod google_gemini;
pub mod openai_chat;

pub(crate) use blocking::BlockingRuntime;

use google_gemini::GoogleGeminiProvider;
use openai_chat::OpenAiChatProvider;

/// Provider 原样输出的增量文本 包含空片段
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

/// 采样参数 `None` 表示沿用 Provider 默认值
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
}

impl GenerationParams {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            max_tokens: Some(config.max_tokens()),
            temperature: Some(config.temperature()),
            frequency_penalty: Some(config.frequency_penalty()),
            presence_penalty: Some(config.presence_penalty()),
        }
    }
}

/// 交给 Provider 的单次补全请求
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub params: GenerationParams,
}

/// 归一化之前的 Provider 回复
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderReply {
    pub choices: Vec<ReplyChoice>,
    pub usage: Option<ProviderUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyChoice {
    pub content: Option<String>,
}

/// Provider 原样上报的 token 计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

/// 所有 Provider 共有的阻塞补全能力
pub trait ChatProvider: Send + Sync {
    /// 客户端类型名 用于能力错误信息
    fn name(&self) -> &'static str;

    /// 发送一次请求并阻塞当前线程直到收到回复
    fn invoke(&self, request: ProviderRequest) -> Result<ProviderReply, ChatError>;
}

/// 同时支持异步与流式调用的 Provider
#[async_trait]
pub trait AsyncChatProvider: ChatProvider {
    /// 发送一次请求 不阻塞调用线程
    async fn ainvoke(&self, request: ProviderRequest) -> Result<ProviderReply, ChatError>;

    /// 发起流式请求 返回增量文本
    async fn stream(&self, request: ProviderRequest) -> Result<DeltaStream, ChatError>;
}

/// 客户端构建时确定的能力集合
#[derive(Clone)]
pub enum ProviderHandle {
    Blocking(Arc<dyn ChatProvider>),
    Async(Arc<dyn AsyncChatProvider>),
}

impl ProviderHandle {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderHandle::Blocking(provider) => provider.name(),
            ProviderHandle::Async(provider) => provider.name(),
        }
    }

    pub fn invoke(&self, request: ProviderRequest) -> Result<ProviderReply, ChatError> {
        match self {
            ProviderHandle::Blocking(provider) => provider.invoke(request),
            ProviderHandle::Async(provider) => provider.invoke(request),
        }
    }

    /// 返回异步能力 或 "does not support async calls" 错误
    pub fn async_provider(&self) -> Result<Arc<dyn AsyncChatProvider>, ChatError> {
        match self {
            ProviderHandle::Async(provider) => Ok(Arc::clone(provider)),
            ProviderHandle::Blocking(provider) => Err(ChatError::AsyncUnsupported {
                client: provider.name(),
            }),
        }
    }

    pub fn supports_async(&self) -> bool {
        matches!(self, ProviderHandle::Async(_))
    }
}

impl From<Arc<dyn ChatProvider>> for ProviderHandle {
    fn from(provider: Arc<dyn ChatProvider>) -> Self {
        ProviderHandle::Blocking(provider)
    }
}

impl From<Arc<dyn AsyncChatProvider>> for ProviderHandle {
    fn from(provider: Arc<dyn AsyncChatProvider>) -> Self {
        ProviderHandle::Async(provider)
    }
}

/// 按 `config` 选择并构建 HTTP Provider
pub fn build_provider(config: &ChatConfig, transport: DynHttpTransport) -> ProviderHandle {
    let provider: Arc<dyn AsyncChatProvider> = match config.provider() {
        ProviderKind::OpenAi => Arc::new(
            OpenAiChatProvider::new(transport, config.api_key())
                .with_base_url(config.base_url())
                .with_timeout(config.request_timeout()),
        ),
        ProviderKind::Google => {
            let mut provider = GoogleGeminiProvider::new(transport, config.api_key())
                .with_timeout(config.request_timeout());
            // 共享默认值指向 OpenAI 只有显式配置的 URL 才会改写 Gemini 地址
            if config.base_url() != crate::config::DEFAULT_BASE_URL {
                provider = provider.with_base_url(config.base_url());
            }
            Arc::new(provider)
        }
    };
    tracing::debug!(
        provider = %config.provider(),
        client = provider.name(),
        model = config.model(),
        "built chat provider"
    );
    ProviderHandle::Async(provider)
}

/// 解析数值形式的 `Retry-After` 头
pub(crate) fn retry_after_from_headers(headers: &HashMap<String, String>) -> Option<Duration> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
        .and_then(|(_, value)| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::reqwest::default_dyn_transport;

    struct SyncOnly;

    impl ChatProvider for SyncOnly {
        fn name(&self) -> &'static str {
            "SyncOnly"
        }

        fn invoke(&self, _request: ProviderRequest) -> Result<ProviderReply, ChatError> {
            Ok(ProviderReply::default())
        }
    }

    #[test]
    fn blocking_handle_refuses_async_access() {
        let handle = ProviderHandle::from(Arc::new(SyncOnly) as Arc<dyn ChatProvider>);
        assert!(!handle.supports_async());
        let err = handle.async_provider().err().expect("should fail");
        assert_eq!(err.to_string(), "SyncOnly does not support async calls");
    }

    #[test]
    fn build_provider_follows_provider_kind() {
        let transport = default_dyn_transport().expect("transport");
        let openai = ChatConfig::new("key").unwrap();
        let handle = build_provider(&openai, transport.clone());
        assert!(handle.supports_async());
        assert_eq!(handle.name(), "OpenAiChatProvider");

        let google = ChatConfig::new("key")
            .unwrap()
            .with_provider(ProviderKind::Google);
        assert_eq!(build_provider(&google, transport).name(), "GoogleGeminiProvider");
    }

    #[test]
    fn retry_after_parses_numeric_seconds_case_insensitively() {
        let headers = HashMap::from([("Retry-After".to_string(), " 7 ".to_string())]);
        assert_eq!(retry_after_from_headers(&headers), Some(Duration::from_secs(7)));
        let headers = HashMap::from([(
            "retry-after".to_string(),
            "Wed, 21 Oct 2015 07:28:00 GMT".to_string(),
        )]);
        assert_eq!(retry_after_from_headers(&headers), None);
    }
}
