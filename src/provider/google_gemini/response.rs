use crate::provider::{ProviderReply, ProviderUsage, ReplyChoice};

use super::types::GeminiGenerateContentResponse;

/// 将 GenerateContentResponse 映射为 [`ProviderReply`] 候选按 index 排序
pub(crate) fn map_response(response: GeminiGenerateContentResponse) -> ProviderReply {
    let mut candidates: Vec<_> = response
        .candidates
        .into_iter()
        .enumerate()
        .map(|(position, candidate)| (candidate.index.unwrap_or(position), candidate))
        .collect();
    candidates.sort_by_key(|(index, _)| *index);

    ProviderReply {
        choices: candidates
            .into_iter()
            .map(|(_, candidate)| ReplyChoice {
                content: candidate.content.and_then(|content| content.text()),
            })
            .collect(),
        usage: response.usage_metadata.map(|usage| ProviderUsage {
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_parts_and_skips_thoughts() {
        let parsed: GeminiGenerateContentResponse = serde_json::from_str(
            r#"{
              "candidates": [{
                "content": {"role": "model", "parts": [
                  {"text": "thinking...", "thought": true},
                  {"text": "Hello, "},
                  {"functionCall": {"name": "noop", "args": {}}},
                  {"text": "world"}
                ]},
                "finishReason": "STOP",
                "index": 0
              }],
              "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 7, "totalTokenCount": 11},
              "modelVersion": "gemini-2.0-flash"
            }"#,
        )
        .expect("parse");

        let reply = map_response(parsed);
        assert_eq!(reply.choices.len(), 1);
        assert_eq!(reply.choices[0].content.as_deref(), Some("Hello, world"));
        assert_eq!(
            reply.usage,
            Some(ProviderUsage {
                prompt_tokens: Some(4),
                completion_tokens: Some(7),
                total_tokens: Some(11),
            })
        );
    }

    #[test]
    fn blocked_candidate_has_no_content() {
        let parsed: GeminiGenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).expect("parse");
        let reply = map_response(parsed);
        assert_eq!(reply.choices, vec![ReplyChoice { content: None }]);
        assert!(reply.usage.is_none());
    }
}
