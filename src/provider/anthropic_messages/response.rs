use crate::error::LLMError;
use crate::types::{Reply, Role, TokenUsage};

use super::types::{AnthropicMessageResponse, AnthropicUsage};

/// Takes the reply text from the first content element.
pub(crate) fn map_response(
    resp: AnthropicMessageResponse,
    provider: &'static str,
) -> Result<Reply, LLMError> {
    let first = resp.content.into_iter().next().ok_or_else(|| {
        LLMError::provider(
            provider,
            format!(
                "response contained no content (stop_reason: {})",
                resp.stop_reason.as_deref().unwrap_or("unknown")
            ),
        )
    })?;
    let text = first.text.ok_or_else(|| {
        LLMError::provider(
            provider,
            format!("first content block is {} rather than text", first.kind),
        )
    })?;

    Ok(Reply {
        role: Role::Assistant,
        text,
        model: resp.model,
        usage: resp.usage.as_ref().map(convert_usage),
        provider,
        warnings: Vec::new(),
    })
}

fn convert_usage(usage: &AnthropicUsage) -> TokenUsage {
    let total = match (usage.input_tokens, usage.output_tokens) {
        (Some(input), Some(output)) => Some(input + output),
        _ => None,
    };
    TokenUsage {
        prompt_tokens: usage.input_tokens,
        completion_tokens: usage.output_tokens,
        total_tokens: total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_first_text_block() {
        let resp: AnthropicMessageResponse = serde_json::from_str(
            r#"{
  "id": "msg_01",
  "type": "message",
  "role": "assistant",
  "model": "claude-3-opus-20240229",
  "content": [{"type": "text", "text": "Hello!"}, {"type": "text", "text": "ignored"}],
  "stop_reason": "end_turn",
  "usage": {"input_tokens": 12, "output_tokens": 3}
}"#,
        )
        .expect("response json");

        let reply = map_response(resp, "anthropic_messages").expect("reply");
        assert_eq!(reply.text, "Hello!");
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.usage.and_then(|u| u.total_tokens), Some(15));
    }

    #[test]
    fn non_text_first_block_is_an_error() {
        let resp: AnthropicMessageResponse = serde_json::from_str(
            r#"{"model":"claude","content":[{"type":"tool_use","id":"t1","name":"f","input":{}}]}"#,
        )
        .expect("response json");
        let err = map_response(resp, "anthropic_messages").expect_err("not text");
        assert!(matches!(err, LLMError::Provider { .. }));
    }
}
