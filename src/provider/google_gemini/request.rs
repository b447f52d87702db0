use crate::error::LLMError;
use crate::types::{ChatOptions, Message, Role};

use super::types::{
    GeminiContent, GeminiGenerateContentRequest, GeminiGenerationConfig, GeminiPart,
};

/// Request body plus the number of image blocks that had to be dropped.
pub(crate) struct GeminiBody {
    pub(crate) request: GeminiGenerateContentRequest,
    pub(crate) dropped_images: usize,
}

/// Builds the single replay prompt: user turns only, in order, one per line.
///
/// # Examples
///
/// ```
/// # use kotoba_session::provider::google_gemini::build_gemini_prompt;
/// # use kotoba_session::types::Message;
/// let history = vec![Message::user("A"), Message::assistant("B"), Message::user("C")];
/// assert_eq!(build_gemini_prompt(&history), "A\nC");
/// ```
pub fn build_gemini_prompt(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|message| message.role == Role::User)
        .map(Message::flattened_text)
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn build_gemini_body(
    messages: &[Message],
    options: &ChatOptions,
) -> Result<GeminiBody, LLMError> {
    let prompt = build_gemini_prompt(messages);
    if prompt.trim().is_empty() {
        return Err(LLMError::Validation {
            message: "Gemini request requires at least one user turn with text".to_string(),
        });
    }
    let dropped_images = messages
        .iter()
        .filter(|message| message.role == Role::User)
        .map(Message::image_count)
        .sum();

    Ok(GeminiBody {
        request: GeminiGenerateContentRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: Some(prompt) }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: options.max_output_tokens,
            },
        },
        dropped_images,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentBlock, ImageDetail};
    use serde_json::json;

    fn options() -> ChatOptions {
        ChatOptions {
            model: "gemini-1.5-pro".to_string(),
            max_output_tokens: 1024,
        }
    }

    #[test]
    fn replays_user_turns_only() {
        let messages = vec![
            Message::system("be helpful"),
            Message::user("A"),
            Message::assistant("B"),
            Message::user_blocks(vec![
                ContentBlock::text("C"),
                ContentBlock::image("https://example.com/c.png", ImageDetail::High),
            ]),
        ];

        let body = build_gemini_body(&messages, &options()).expect("body");
        assert_eq!(body.dropped_images, 1);
        assert_eq!(
            serde_json::to_value(&body.request).expect("json"),
            json!({
                "contents": [{"role": "user", "parts": [{"text": "A\nC"}]}],
                "generationConfig": {"maxOutputTokens": 1024}
            })
        );
    }

    #[test]
    fn history_without_user_text_is_rejected() {
        let messages = vec![Message::system("only instructions")];
        assert!(matches!(
            build_gemini_body(&messages, &options()),
            Err(LLMError::Validation { .. })
        ));
    }
}
