use crate::error::ChatError;
use crate::provider::ProviderRequest;
use crate::types::Role;

use super::types::{
    GeminiGenerationConfig, GeminiOwnedTextPart, GeminiRequest, GeminiRequestContent,
    GeminiSystemInstruction, GeminiTextPart,
};

/// 构建 GenerateContent 请求体
///
/// system 消息合并进 `system_instruction` assistant 消息使用 Gemini 的 `model` 角色
/// frequency 与 presence penalty 不会转发
pub(crate) fn build_gemini_body(request: &ProviderRequest) -> Result<GeminiRequest<'_>, ChatError> {
    let mut system_texts = Vec::new();
    let mut contents = Vec::new();
    for message in &request.messages {
        let role = match message.role {
            Role::System => {
                system_texts.push(message.content.as_str());
                continue;
            }
            Role::User => "user",
            Role::Assistant => "model",
        };
        contents.push(GeminiRequestContent {
            role,
            parts: [GeminiTextPart {
                text: &message.content,
            }],
        });
    }

    if contents.is_empty() {
        return Err(ChatError::Validation {
            message: "Gemini GenerateContent requires at least one non-system message".to_string(),
        });
    }

    let params = &request.params;
    if params.frequency_penalty.is_some() || params.presence_penalty.is_some() {
        tracing::debug!("Gemini does not accept frequency/presence penalties; dropping them");
    }
    let generation_config = (params.temperature.is_some() || params.max_tokens.is_some()).then(|| {
        GeminiGenerationConfig {
            temperature: params.temperature,
            max_output_tokens: params.max_tokens,
        }
    });

    Ok(GeminiRequest {
        contents,
        system_instruction: (!system_texts.is_empty()).then(|| GeminiSystemInstruction {
            parts: [GeminiOwnedTextPart {
                text: system_texts.join("\n\n"),
            }],
        }),
        generation_config,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::provider::GenerationParams;
    use crate::types::Message;

    fn request(messages: Vec<Message>, params: GenerationParams) -> ProviderRequest {
        ProviderRequest {
            model: "gemini-2.0-flash".to_string(),
            messages,
            params,
        }
    }

    #[test]
    fn folds_system_and_maps_assistant_to_model() {
        let request = request(
            vec![
                Message::system("Be terse."),
                Message::user("hi"),
                Message::assistant("hello"),
                Message::user("2+2?"),
            ],
            GenerationParams {
                max_tokens: Some(128),
                temperature: Some(0.25),
                frequency_penalty: Some(1.0),
                presence_penalty: Some(1.0),
            },
        );
        let body = serde_json::to_value(build_gemini_body(&request).expect("body")).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello"}]},
                    {"role": "user", "parts": [{"text": "2+2?"}]}
                ],
                "system_instruction": {"parts": [{"text": "Be terse."}]},
                "generationConfig": {"temperature": 0.25, "maxOutputTokens": 128}
            })
        );
    }

    #[test]
    fn omits_generation_config_when_nothing_is_set() {
        let request = request(vec![Message::user("hi")], GenerationParams::default());
        let body = serde_json::to_value(build_gemini_body(&request).expect("body")).unwrap();
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("system_instruction").is_none());
    }

    #[test]
    fn temperature_keeps_its_short_decimal_form() {
        let request = request(
            vec![Message::user("hi")],
            GenerationParams {
                temperature: Some(0.2),
                ..GenerationParams::default()
            },
        );
        let bytes = serde_json::to_vec(&build_gemini_body(&request).expect("body")).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(r#""temperature":0.2}"#), "{text}");
    }

    #[test]
    fn system_only_history_is_rejected() {
        let request = request(vec![Message::system("alone")], GenerationParams::default());
        let err = build_gemini_body(&request).expect_err("should fail");
        assert!(matches!(err, ChatError::Validation { .. }));
    }
}
