//! 补全调用入口
//!
//! [`ChatClient`] 走阻塞调用 [`AsyncChatClient`] 走异步调用并支持流式输出
//! 每次调用都会重新构建消息列表 只发送一次请求 所有失败统一折叠为 [`ChatResult::Failure`]

use futures_util::{TryStreamExt, future, stream};

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::http::DynHttpTransport;
use crate::http::reqwest::default_dyn_transport;
use crate::provider::{GenerationParams, ProviderHandle, ProviderReply, ProviderRequest, build_provider};
use crate::request::{apply_stream_system_prompt, build_messages};
use crate::types::{ChatCompletion, ChatResult, Message, TextStream, TokenUsage};

/// 阻塞式补全客户端
///
/// 不能在 tokio 运行时内部调用 否则返回 transport 错误 这种场景请改用 [`AsyncChatClient`]
pub struct ChatClient {
    config: ChatConfig,
    provider: ProviderHandle,
}

impl ChatClient {
    /// 使用独立的 reqwest 传输层创建客户端
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        Ok(Self::with_transport(config, default_dyn_transport()?))
    }

    pub fn with_transport(config: ChatConfig, transport: DynHttpTransport) -> Self {
        let provider = build_provider(&config, transport);
        Self::with_provider(config, provider)
    }

    /// 包装已构建好的 Provider 例如自定义或仅支持阻塞调用的实现
    pub fn with_provider(config: ChatConfig, provider: impl Into<ProviderHandle>) -> Self {
        Self {
            config,
            provider: provider.into(),
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// 在 `prior` 之后追加 `prompt` 发送 返回归一化后的结果
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use chat_adapter::{ChatClient, ChatConfig};
    ///
    /// let client = ChatClient::new(ChatConfig::from_env()?)?;
    /// let result = client.complete("What is 2+2?", None);
    /// match result.message() {
    ///     Some(message) => println!("{}", message.content),
    ///     None => eprintln!("{}", result.error().unwrap_or_default()),
    /// }
    /// # Ok::<(), chat_adapter::ChatError>(())
    /// ```
    pub fn complete(&self, prompt: &str, prior: Option<&[Message]>) -> ChatResult {
        log_outcome(self.try_complete(prompt, prior)).into()
    }

    /// 与 [`ChatClient::complete`] 相同 但保留类型化错误
    pub fn try_complete(
        &self,
        prompt: &str,
        prior: Option<&[Message]>,
    ) -> Result<ChatCompletion, ChatError> {
        let request = completion_request(&self.config, prompt, prior);
        let reply = self.provider.invoke(request)?;
        normalize_reply(self.provider.name(), reply)
    }
}

/// 异步补全与流式输出客户端
pub struct AsyncChatClient {
    config: ChatConfig,
    provider: ProviderHandle,
}

impl AsyncChatClient {
    /// 使用独立的 reqwest 传输层创建客户端
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        Ok(Self::with_transport(config, default_dyn_transport()?))
    }

    pub fn with_transport(config: ChatConfig, transport: DynHttpTransport) -> Self {
        let provider = build_provider(&config, transport);
        Self::with_provider(config, provider)
    }

    /// 包装已构建好的 Provider
    ///
    /// 允许传入 [`ProviderHandle::Blocking`] 但之后每次调用都会返回
    /// "`<name>` does not support async calls"
    pub fn with_provider(config: ChatConfig, provider: impl Into<ProviderHandle>) -> Self {
        Self {
            config,
            provider: provider.into(),
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn complete(&self, prompt: &str, prior: Option<&[Message]>) -> ChatResult {
        log_outcome(self.try_complete(prompt, prior).await).into()
    }

    pub async fn try_complete(
        &self,
        prompt: &str,
        prior: Option<&[Message]>,
    ) -> Result<ChatCompletion, ChatError> {
        let provider = self.provider.async_provider()?;
        let request = completion_request(&self.config, prompt, prior);
        let reply = provider.ainvoke(request).await?;
        normalize_reply(provider.name(), reply)
    }

    /// 以文本片段的形式流式返回助手回复
    ///
    /// 首次 poll 之前不会发出请求 空片段会被跳过
    /// 错误 包括建立流失败 都以 `Err` 元素交给调用方
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use futures_util::StreamExt;
    /// use chat_adapter::{AsyncChatClient, ChatConfig, Message};
    ///
    /// # async fn run() -> Result<(), chat_adapter::ChatError> {
    /// let client = AsyncChatClient::new(ChatConfig::from_env()?)?;
    /// let mut deltas = client.stream(&[Message::user("Tell me a joke")]);
    /// while let Some(delta) = deltas.next().await {
    ///     print!("{}", delta?);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn stream(&self, messages: &[Message]) -> TextStream {
        let messages = apply_stream_system_prompt(
            self.config.stream_system_prompt(),
            self.config.system_prompt(),
            messages,
        );
        tracing::debug!(?messages, "streaming messages");
        let request = ProviderRequest {
            model: self.config.model().to_string(),
            messages,
            params: GenerationParams::default(),
        };

        let provider = self.provider.clone();
        let deltas = stream::once(async move {
            let provider = provider.async_provider()?;
            provider.stream(request).await
        })
        .try_flatten()
        .try_filter(|delta| future::ready(!delta.is_empty()))
        .inspect_err(|err| tracing::error!(error = %err, "streaming failed"));
        Box::pin(deltas)
    }
}

fn completion_request(config: &ChatConfig, prompt: &str, prior: Option<&[Message]>) -> ProviderRequest {
    let messages = build_messages(config.system_prompt(), prior.unwrap_or_default(), prompt);
    tracing::debug!(?messages, "sending messages");
    ProviderRequest {
        model: config.model().to_string(),
        messages,
        params: GenerationParams::from_config(config),
    }
}

fn log_outcome(
    result: Result<ChatCompletion, ChatError>,
) -> Result<ChatCompletion, ChatError> {
    result.inspect_err(|err| tracing::error!(error = %err, kind = ?err.kind(), "chat completion failed"))
}

/// 从 Provider 回复中取出第一个候选和 token 计数
fn normalize_reply(provider: &'static str, reply: ProviderReply) -> Result<ChatCompletion, ChatError> {
    let content = reply
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::malformed(provider, "response contained no choices"))?
        .content
        .ok_or_else(|| ChatError::malformed(provider, "first choice has no message content"))?;

    let usage = reply
        .usage
        .ok_or_else(|| ChatError::malformed(provider, "response has no token usage"))?;
    let tokens_input = usage
        .prompt_tokens
        .ok_or_else(|| ChatError::malformed(provider, "token usage lacks the prompt count"))?;
    let tokens_output = usage
        .completion_tokens
        .ok_or_else(|| ChatError::malformed(provider, "token usage lacks the completion count"))?;

    let tokens_total = match usage.total_tokens {
        Some(total) => total,
        None => tokens_input
            .checked_add(tokens_output)
            .ok_or_else(|| ChatError::malformed(provider, "token usage overflows"))?,
    };

    Ok(ChatCompletion {
        message: Message::assistant(content.trim()),
        token_usage: TokenUsage {
            tokens_input,
            tokens_output,
            tokens_total,
        },
    })
}
