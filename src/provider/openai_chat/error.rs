use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LLMError, extract_model_identifier, looks_like_token_limit_error};

const PROVIDER: &str = "openai_chat";

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ApiError>,
}

/// `code` is a string for most errors but a number or null for some gateways.
#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
    code: Option<Value>,
}

/// Maps a Chat Completions error response onto [`LLMError`].
pub(crate) fn parse_openai_error(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> LLMError {
    let Some(error) = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
    else {
        return LLMError::provider(PROVIDER, format!("status {status}: {body}"));
    };

    let code = error.code.as_ref().and_then(Value::as_str);
    let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
    if let Some(code) = code {
        message = format!("{message} ({code})");
    }

    if looks_like_token_limit_error(code, &message) {
        return LLMError::TokenLimitExceeded { message };
    }
    if status == 404 || code == Some("model_not_found") {
        return LLMError::ModelNotFound {
            model: extract_model_identifier(&message),
            message,
        };
    }

    match status {
        401 | 403 => LLMError::Auth { message },
        429 => LLMError::RateLimit {
            message,
            retry_after,
        },
        400 | 422 => LLMError::Validation { message },
        _ => LLMError::provider(PROVIDER, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_auth_and_rate_limit_errors() {
        let body = r#"{
  "error": {
    "message": "Incorrect API key provided",
    "type": "invalid_request_error",
    "code": "invalid_api_key"
  }
}"#;
        match parse_openai_error(401, body, None) {
            LLMError::Auth { message } => {
                assert!(message.contains("Incorrect API key provided"));
                assert!(message.contains("invalid_api_key"));
            }
            other => panic!("expected Auth error, got {other:?}"),
        }

        let body = r#"{"error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}}"#;
        match parse_openai_error(429, body, Some(Duration::from_secs(3))) {
            LLMError::RateLimit { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(3)));
            }
            other => panic!("expected RateLimit error, got {other:?}"),
        }
    }

    #[test]
    fn parse_context_length_and_missing_model() {
        let body = r#"{"error": {"message": "This model's maximum context length is 128000 tokens.", "type": "invalid_request_error", "code": "context_length_exceeded"}}"#;
        assert!(matches!(
            parse_openai_error(400, body, None),
            LLMError::TokenLimitExceeded { .. }
        ));

        let body = r#"{"error": {"message": "The model `gpt-9` does not exist", "type": "invalid_request_error", "code": "model_not_found"}}"#;
        match parse_openai_error(404, body, None) {
            LLMError::ModelNotFound { model, .. } => assert_eq!(model.as_deref(), Some("gpt-9")),
            other => panic!("expected ModelNotFound, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_body_falls_back_to_provider_error() {
        match parse_openai_error(502, "bad gateway", None) {
            LLMError::Provider { provider, message } => {
                assert_eq!(provider, "openai_chat");
                assert!(message.contains("status 502: bad gateway"));
            }
            other => panic!("expected Provider error, got {other:?}"),
        }
    }
}
