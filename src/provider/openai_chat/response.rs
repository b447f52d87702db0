use crate::error::LLMError;
use crate::types::{Reply, Role, TokenUsage};

use super::types::{OpenAiChatResponse, OpenAiMessageContent, OpenAiUsage};

/// Extracts the first completion's role and text.
pub(crate) fn map_response(
    resp: OpenAiChatResponse,
    provider: &'static str,
) -> Result<Reply, LLMError> {
    let choice = resp
        .choices
        .into_iter()
        .min_by_key(|choice| choice.index)
        .ok_or_else(|| LLMError::provider(provider, "response contained no choices"))?;
    let message = choice.message.ok_or_else(|| {
        LLMError::provider(
            provider,
            format!(
                "first choice carried no message (finish_reason: {})",
                choice.finish_reason.as_deref().unwrap_or("unknown")
            ),
        )
    })?;

    let role = match message.role.as_deref() {
        Some("system") => Role::System,
        Some("user") => Role::User,
        _ => Role::Assistant,
    };
    let text = match message.content {
        Some(OpenAiMessageContent::Text(text)) => text,
        Some(OpenAiMessageContent::Parts(parts)) => parts
            .into_iter()
            .filter(|part| part.kind == "text" || part.kind == "output_text")
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("\n"),
        None => message.refusal.unwrap_or_default(),
    };

    Ok(Reply {
        role,
        text,
        model: resp.model,
        usage: resp.usage.map(convert_usage),
        provider,
        warnings: Vec::new(),
    })
}

fn convert_usage(usage: OpenAiUsage) -> TokenUsage {
    TokenUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> OpenAiChatResponse {
        serde_json::from_str(body).expect("response json")
    }

    #[test]
    fn maps_first_choice_text_and_usage() {
        let resp = parse(
            r#"{
  "id": "chatcmpl-1",
  "object": "chat.completion",
  "model": "gpt-4o-2024-08-06",
  "choices": [
    {"index": 1, "message": {"role": "assistant", "content": "second"}, "finish_reason": "stop"},
    {"index": 0, "message": {"role": "assistant", "content": "first"}, "finish_reason": "stop"}
  ],
  "usage": {"prompt_tokens": 9, "completion_tokens": 1, "total_tokens": 10}
}"#,
        );
        let reply = map_response(resp, "openai_chat").expect("reply");
        assert_eq!(reply.text, "first");
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.model.as_deref(), Some("gpt-4o-2024-08-06"));
        assert_eq!(reply.usage.and_then(|u| u.total_tokens), Some(10));
    }

    #[test]
    fn joins_text_parts() {
        let resp = parse(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":[
                {"type":"text","text":"a"},{"type":"text","text":"b"}]}}]}"#,
        );
        assert_eq!(map_response(resp, "openai_chat").expect("reply").text, "a\nb");
    }

    #[test]
    fn empty_choices_is_a_provider_error() {
        let err = map_response(parse(r#"{"choices":[]}"#), "openai_chat").expect_err("no choices");
        assert!(matches!(err, LLMError::Provider { provider: "openai_chat", .. }));
    }
}
