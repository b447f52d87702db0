use std::time::Duration;

use serde::Deserialize;

use crate::error::{LLMError, extract_model_identifier, looks_like_token_limit_error};

const PROVIDER: &str = "anthropic_messages";

/// `{"type": "error", "error": {"type": "...", "message": "..."}}`
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
}

/// Maps a Messages API error response onto [`LLMError`].
///
/// The error class in `error.type` (for example `overloaded_error`) takes precedence
/// over the HTTP status.
pub(crate) fn parse_anthropic_error(
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

    let kind = error.kind.as_deref();
    let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
    if let Some(kind) = kind {
        message = format!("{message} ({kind})");
    }

    if looks_like_token_limit_error(None, &message) {
        return LLMError::TokenLimitExceeded { message };
    }

    match (kind, status) {
        (Some("not_found_error"), _) | (_, 404) => LLMError::ModelNotFound {
            model: extract_model_identifier(&message),
            message,
        },
        (Some("authentication_error" | "permission_error"), _) | (_, 401 | 403) => {
            LLMError::Auth { message }
        }
        (Some("rate_limit_error"), _) | (_, 429) => LLMError::RateLimit {
            message,
            retry_after,
        },
        (Some("invalid_request_error"), _) | (_, 400) => LLMError::Validation { message },
        _ => LLMError::provider(PROVIDER, message),
    }
}
