use std::time::Duration;

use serde::Deserialize;

use crate::error::{LLMError, extract_model_identifier, looks_like_token_limit_error};

const PROVIDER: &str = "google_gemini";

#[derive(Deserialize)]
struct RpcEnvelope {
    error: Option<RpcStatus>,
}

/// Google RPC status object: `{"code": 400, "message": "...", "status": "INVALID_ARGUMENT"}`.
#[derive(Deserialize)]
struct RpcStatus {
    code: Option<i32>,
    message: Option<String>,
    status: Option<String>,
}

/// Maps a Gemini error response onto [`LLMError`].
///
/// The RPC `status` string decides when present, so errors relayed through a proxy
/// with a generic HTTP status still classify correctly.
pub(crate) fn parse_gemini_error(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> LLMError {
    let Some(rpc) = serde_json::from_str::<RpcEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
    else {
        return LLMError::provider(PROVIDER, format!("status {status}: {body}"));
    };

    let rpc_status = rpc.status.as_deref().filter(|s| !s.is_empty());
    let mut message = rpc.message.unwrap_or_else(|| "unknown error".to_string());
    if let Some(rpc_status) = rpc_status {
        message = format!("{message} ({rpc_status})");
    }

    if looks_like_token_limit_error(rpc_status, &message) {
        return LLMError::TokenLimitExceeded { message };
    }

    match (rpc_status, status) {
        (Some("NOT_FOUND"), _) | (None, 404) => LLMError::ModelNotFound {
            model: extract_model_identifier(&message),
            message,
        },
        (Some("UNAUTHENTICATED" | "PERMISSION_DENIED"), _) | (None, 401 | 403) => {
            LLMError::Auth { message }
        }
        (Some("RESOURCE_EXHAUSTED"), _) | (None, 429) => LLMError::RateLimit {
            message,
            retry_after,
        },
        (Some("INVALID_ARGUMENT" | "FAILED_PRECONDITION"), _) | (None, 400) => {
            LLMError::Validation { message }
        }
        _ => LLMError::provider(
            PROVIDER,
            format!("{message} [code {}]", rpc.code.unwrap_or(i32::from(status))),
        ),
    }
}
