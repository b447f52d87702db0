use crate::error::LLMError;
use crate::types::{Reply, Role, TokenUsage};

use super::types::{GeminiGenerateContentResponse, GeminiUsageMetadata};

/// Concatenates the text parts of the first candidate.
pub(crate) fn map_response(
    resp: GeminiGenerateContentResponse,
    provider: &'static str,
) -> Result<Reply, LLMError> {
    let usage = resp.usage_metadata.as_ref().map(convert_usage);
    let Some(candidate) = resp.candidates.into_iter().next() else {
        let reason = resp
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(LLMError::provider(
            provider,
            format!("Gemini returned no answer: {reason}"),
        ));
    };

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(LLMError::provider(
            provider,
            format!(
                "Gemini candidate carried no text (finishReason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        ));
    }

    Ok(Reply {
        role: Role::Assistant,
        text,
        model: resp.model_version,
        usage,
        provider,
        warnings: Vec::new(),
    })
}

fn convert_usage(usage: &GeminiUsageMetadata) -> TokenUsage {
    TokenUsage {
        prompt_tokens: usage.prompt_token_count,
        completion_tokens: usage.candidates_token_count,
        total_tokens: usage.total_token_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> GeminiGenerateContentResponse {
        serde_json::from_str(body).expect("response json")
    }

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let resp = parse(
            r#"{
  "candidates": [{
    "content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]},
    "finishReason": "STOP",
    "safetyRatings": []
  }],
  "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6},
  "modelVersion": "gemini-1.5-pro-002"
}"#,
        );
        let reply = map_response(resp, "google_gemini").expect("reply");
        assert_eq!(reply.text, "Hello, world");
        assert_eq!(reply.model.as_deref(), Some("gemini-1.5-pro-002"));
        assert_eq!(reply.usage.and_then(|u| u.total_tokens), Some(6));
    }

    #[test]
    fn blocked_prompt_surfaces_block_reason() {
        let resp = parse(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#);
        match map_response(resp, "google_gemini") {
            Err(LLMError::Provider { message, .. }) => assert!(message.contains("SAFETY")),
            other => panic!("expected provider error, got {other:?}"),
        }
    }
}
