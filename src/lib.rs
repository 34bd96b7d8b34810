//! 托管聊天补全 API 的轻量适配层
//!
//! [`ChatClient`] 与 [`AsyncChatClient`] 负责构建消息列表 向兼容 OpenAI 或 Google Gemini 的端点
//! 发送一次请求 并把回复归一化为 [`ChatResult`] [`AsyncChatClient::stream`] 以文本片段形式输出回复

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod provider;
pub mod request;
pub mod stream;
pub mod types;

pub use client::{AsyncChatClient, ChatClient};
pub use config::{ChatConfig, ProviderKind, StreamSystemPrompt};
pub use error::{ChatError, ErrorKind};
pub use provider::{AsyncChatProvider, ChatProvider, ProviderHandle};
pub use types::*;
