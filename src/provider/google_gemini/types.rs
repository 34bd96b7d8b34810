use serde::{Deserialize, Serialize};

/// GenerateContent 请求体 模型名放在 URL 路径中
#[derive(Debug, Serialize)]
pub(crate) struct GeminiRequest<'a> {
    pub(crate) contents: Vec<GeminiRequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) system_instruction: Option<GeminiSystemInstruction>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub(crate) generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiRequestContent<'a> {
    pub(crate) role: &'static str,
    pub(crate) parts: [GeminiTextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiTextPart<'a> {
    pub(crate) text: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiSystemInstruction {
    pub(crate) parts: [GeminiOwnedTextPart; 1],
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiOwnedTextPart {
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    pub(crate) max_output_tokens: Option<u32>,
}

/// GenerateContentResponse 非流式调用与每个流式分片共用
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiGenerateContentResponse {
    #[serde(default)]
    pub(crate) candidates: Vec<GeminiCandidate>,
    #[serde(default, rename = "usageMetadata")]
    pub(crate) usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiCandidate {
    #[serde(default)]
    pub(crate) content: Option<GeminiContent>,
    #[serde(default)]
    pub(crate) index: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiContent {
    #[serde(default)]
    pub(crate) parts: Vec<GeminiPart>,
}

/// 这里只关心文本 part 媒体与函数调用 part 会被跳过
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiPart {
    #[serde(default)]
    pub(crate) text: Option<String>,
    /// 思考过程 part 的标记 不属于最终回答
    #[serde(default)]
    pub(crate) thought: Option<bool>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct GeminiUsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    pub(crate) prompt_token_count: Option<u64>,
    #[serde(rename = "candidatesTokenCount", default)]
    pub(crate) candidates_token_count: Option<u64>,
    #[serde(rename = "totalTokenCount", default)]
    pub(crate) total_token_count: Option<u64>,
}

impl GeminiContent {
    /// 拼接后的回答文本 没有文本 part 时返回 `None`
    pub(crate) fn text(&self) -> Option<String> {
        let mut texts = self
            .parts
            .iter()
            .filter(|part| !part.thought.unwrap_or(false))
            .filter_map(|part| part.text.as_deref())
            .peekable();
        texts.peek()?;
        Some(texts.collect())
    }
}
