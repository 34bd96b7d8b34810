use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ChatError;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// 支持的后端 构造时按名称选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// 兼容 OpenAI 的 `/chat/completions`
    #[default]
    OpenAi,
    /// Google Generative Language `generateContent`
    Google,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI",
            ProviderKind::Google => "GOOGLE",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ChatError;

    /// 不区分大小写地匹配固定的 Provider 集合
    ///
    /// ```
    /// use chat_adapter::config::ProviderKind;
    ///
    /// assert_eq!("google".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
    /// assert!("azure".parse::<ProviderKind>().is_err());
    /// ```
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OPENAI" => Ok(ProviderKind::OpenAi),
            "GOOGLE" => Ok(ProviderKind::Google),
            other => Err(ChatError::config(
                "LLM_PROVIDER",
                format!("unsupported provider {other:?}, expected OPENAI or GOOGLE"),
            )),
        }
    }
}

/// 流式路径是否强制插入配置的系统提示词
///
/// 补全路径只在历史中没有 system 消息时插入
/// 流式路径一直是无条件前置 `Always` 保持这一行为
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamSystemPrompt {
    #[default]
    Always,
    IfMissing,
}

impl FromStr for StreamSystemPrompt {
    type Err = ChatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(StreamSystemPrompt::Always),
            "if_missing" | "if-missing" => Ok(StreamSystemPrompt::IfMissing),
            other => Err(ChatError::config(
                "LLM_STREAM_SYSTEM_PROMPT",
                format!("unsupported value {other:?}, expected always or if_missing"),
            )),
        }
    }
}

/// 客户端每次调用共享的不可变配置
///
/// API key 在 [`ChatConfig::new`] 中校验 之后不可替换
///
/// # Examples
///
/// ```
/// use chat_adapter::config::{ChatConfig, ProviderKind};
///
/// let config = ChatConfig::new("sk-test")
///     .unwrap()
///     .with_provider(ProviderKind::OpenAi)
///     .with_model("gpt-4o-mini")
///     .with_temperature(0.0);
/// assert_eq!(config.model(), "gpt-4o-mini");
/// assert!(ChatConfig::new("   ").is_err());
/// ```
#[derive(Clone)]
pub struct ChatConfig {
    provider: ProviderKind,
    api_key: String,
    model: String,
    base_url: String,
    system_prompt: String,
    max_tokens: u32,
    temperature: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    stream_system_prompt: StreamSystemPrompt,
    request_timeout: Option<Duration>,
    log_level: String,
}

impl ChatConfig {
    /// 除 key 以外全部使用默认值构建配置
    ///
    /// # Errors
    ///
    /// `api_key` 为空或仅含空白时返回 [`ChatError::Configuration`]
    pub fn new(api_key: impl Into<String>) -> Result<Self, ChatError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            tracing::error!("LLM_API_KEY environment variable is not set");
            return Err(ChatError::config(
                "LLM_API_KEY",
                "environment variable is not set",
            ));
        }
        Ok(Self {
            provider: ProviderKind::default(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stream_system_prompt: StreamSystemPrompt::default(),
            request_timeout: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        })
    }

    /// 加载 `.env` (如果存在) 并读取 `LLM_*` 环境变量
    pub fn from_env() -> Result<Self, ChatError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键查询函数构建配置 变量名与 [`ChatConfig::from_env`] 相同
    /// 空白值视为未设置
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut config = Self::new(get("LLM_API_KEY").unwrap_or_default())?;
        if let Some(provider) = get("LLM_PROVIDER") {
            config.provider = provider.parse().inspect_err(|err| {
                tracing::error!(error = %err, "rejected LLM_PROVIDER");
            })?;
        }
        if let Some(model) = get("LLM_MODEL") {
            config.model = model;
        }
        if let Some(base_url) = get("LLM_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(prompt) = get("LLM_SYSTEM_PROMPT") {
            config.system_prompt = prompt;
        }
        if let Some(value) = get("LLM_MAX_TOKENS") {
            config.max_tokens = parse_field("LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = get("LLM_TEMPERATURE") {
            config.temperature = parse_field("LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = get("LLM_FREQUENCY_PENALTY") {
            config.frequency_penalty = parse_field("LLM_FREQUENCY_PENALTY", &value)?;
        }
        if let Some(value) = get("LLM_PRESENCE_PENALTY") {
            config.presence_penalty = parse_field("LLM_PRESENCE_PENALTY", &value)?;
        }
        if let Some(value) = get("LLM_STREAM_SYSTEM_PROMPT") {
            config.stream_system_prompt = value.parse()?;
        }
        if let Some(value) = get("LLM_TIMEOUT_SECS") {
            let secs: f64 = parse_field("LLM_TIMEOUT_SECS", &value)?;
            if secs <= 0.0 {
                return Err(ChatError::config(
                    "LLM_TIMEOUT_SECS",
                    format!("{value:?}: must be greater than zero"),
                ));
            }
            config.request_timeout = Some(Duration::try_from_secs_f64(secs).map_err(|err| {
                ChatError::config("LLM_TIMEOUT_SECS", format!("{value:?}: {err}"))
            })?);
        }
        if let Some(level) = get("LLM_LOG_LEVEL") {
            config.log_level = level;
        }
        Ok(config)
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_frequency_penalty(mut self, penalty: f32) -> Self {
        self.frequency_penalty = penalty;
        self
    }

    pub fn with_presence_penalty(mut self, penalty: f32) -> Self {
        self.presence_penalty = penalty;
        self
    }

    pub fn with_stream_system_prompt(mut self, policy: StreamSystemPrompt) -> Self {
        self.stream_system_prompt = policy;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn frequency_penalty(&self) -> f32 {
        self.frequency_penalty
    }

    pub fn presence_penalty(&self) -> f32 {
        self.presence_penalty
    }

    pub fn stream_system_prompt(&self) -> StreamSystemPrompt {
        self.stream_system_prompt
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("system_prompt", &self.system_prompt)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("frequency_penalty", &self.frequency_penalty)
            .field("presence_penalty", &self.presence_penalty)
            .field("stream_system_prompt", &self.stream_system_prompt)
            .field("request_timeout", &self.request_timeout)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn parse_field<T>(field: &str, value: &str) -> Result<T, ChatError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| ChatError::config(field, format!("{value:?}: {err}")))
}
