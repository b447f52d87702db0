use std::time::Duration;

use thiserror::Error;

/// Aggregates every failure mode exposed by a conversation session.
///
/// Session-level variants (prompt size, history budget, capability checks) are raised
/// before any network traffic. Vendor and transport variants come back from an adapter
/// after a request was attempted. Use [`LLMError::category`] to tell "fix your input"
/// conditions apart from "fix your environment" and "this cannot be done".
#[derive(Debug, Error)]
pub enum LLMError {
    /// No exact tokenizer is known for the requested OpenAI model.
    #[error("token counting is not implemented for model {model}: {reason}")]
    UnsupportedModel { model: String, reason: String },
    /// The history cannot be evicted any further and still exceeds the budget.
    #[error("history exhausted: {remaining} message(s) still need {estimated} tokens, limit is {limit}")]
    HistoryExhausted {
        /// Messages left after the last permitted eviction.
        remaining: usize,
        /// Estimated tokens of the remaining messages.
        estimated: usize,
        /// Context budget that was exceeded.
        limit: usize,
    },
    /// The vendor client could not be established (usually a missing credential).
    #[error("{provider} client unavailable: {reason}")]
    ClientUnavailable {
        provider: &'static str,
        reason: String,
    },
    /// A single-shot prompt is larger than the context budget.
    #[error("prompt too large: estimated {estimated} tokens, limit is {limit}")]
    PromptTooLarge { estimated: usize, limit: usize },
    /// The active provider cannot perform the requested operation.
    #[error("{provider} does not support {capability}")]
    CapabilityUnsupported {
        provider: &'static str,
        capability: &'static str,
    },
    /// A local image could not be read or encoded.
    #[error("failed to encode image {path}: {reason}")]
    ImageEncoding { path: String, reason: String },
    /// A provider name did not match any known vendor.
    #[error("unknown provider: {name}")]
    UnknownProvider { name: String },
    /// The history backup could not be read or written.
    #[error("history backup {path}: {message}")]
    Backup { path: String, message: String },
    /// Represents transport-layer or networking failures.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// Reports invalid or rejected credentials.
    #[error("auth failure: {message}")]
    Auth { message: String },
    /// Indicates that the provider throttled the request.
    #[error("rate limited: {message}")]
    RateLimit {
        /// Raw message returned by the upstream provider.
        message: String,
        /// Wait duration suggested by the provider, if any.
        retry_after: Option<Duration>,
    },
    /// The vendor rejected the request for exceeding its own token limits.
    #[error("token limit exceeded: {message}")]
    TokenLimitExceeded { message: String },
    /// Signals validation failures in the request payload.
    #[error("invalid request: {message}")]
    Validation { message: String },
    /// Indicates that the requested model could not be resolved by the vendor.
    #[error("model not found: {message}")]
    ModelNotFound {
        /// Model identifier extracted from the error payload when available.
        model: Option<String>,
        message: String,
    },
    /// Wraps provider-defined errors that cannot be normalized.
    #[error("provider {provider} error: {message}")]
    Provider {
        /// Name of the provider, such as `openai_chat`.
        provider: &'static str,
        message: String,
    },
}

/// Coarse classification of an [`LLMError`] for user-facing handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller's input must change (prompt too large, unreadable image, ...).
    Input,
    /// The runtime environment must change (credentials, configuration, disk).
    Environment,
    /// The active provider cannot do this at all.
    Unsupported,
    /// The vendor or the network failed while handling a valid request.
    Upstream,
}

impl LLMError {
    /// Creates an [`LLMError::Transport`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_session::error::LLMError;
    ///
    /// let err = LLMError::transport("dns lookup failed");
    /// assert!(matches!(err, LLMError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::Provider`] with the given provider name and message.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_session::error::LLMError;
    ///
    /// let err = LLMError::provider("openai_chat", "bad JSON payload");
    /// assert!(matches!(err, LLMError::Provider { provider: "openai_chat", .. }));
    /// ```
    pub fn provider<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }

    /// Returns which party has to act for the failure to go away.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_session::error::{ErrorCategory, LLMError};
    ///
    /// let err = LLMError::PromptTooLarge { estimated: 200_000, limit: 128_000 };
    /// assert_eq!(err.category(), ErrorCategory::Input);
    /// ```
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HistoryExhausted { .. }
            | Self::PromptTooLarge { .. }
            | Self::ImageEncoding { .. }
            | Self::Validation { .. }
            | Self::TokenLimitExceeded { .. } => ErrorCategory::Input,
            Self::ClientUnavailable { .. }
            | Self::UnknownProvider { .. }
            | Self::Backup { .. }
            | Self::Auth { .. }
            | Self::ModelNotFound { .. } => ErrorCategory::Environment,
            Self::UnsupportedModel { .. } | Self::CapabilityUnsupported { .. } => {
                ErrorCategory::Unsupported
            }
            Self::Transport { .. } | Self::RateLimit { .. } | Self::Provider { .. } => {
                ErrorCategory::Upstream
            }
        }
    }
}

/// Returns `true` when an error code or message suggests a context/window overflow.
pub(crate) fn looks_like_token_limit_error(code_hint: Option<&str>, message: &str) -> bool {
    if let Some(code) = code_hint {
        let lower = code.to_ascii_lowercase();
        if matches!(
            lower.as_str(),
            "context_length_exceeded"
                | "max_context_length_exceeded"
                | "prompt_tokens_exceeded"
                | "context_window_exceeded"
        ) || lower.contains("token")
        {
            return true;
        }
    }

    let lower_message = message.to_ascii_lowercase();
    const HINTS: [&str; 5] = [
        "context length",
        "context window",
        "token limit",
        "maximum context",
        "prompt is too long",
    ];
    HINTS.iter().any(|needle| lower_message.contains(needle))
}

/// Attempts to extract a model identifier from an error payload.
pub(crate) fn extract_model_identifier(message: &str) -> Option<String> {
    for delimiter in ['`', '"', '\''] {
        if let Some(value) = between_delimiters(message, delimiter) {
            if !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

fn between_delimiters(message: &str, delimiter: char) -> Option<String> {
    let start = message.find(delimiter)? + delimiter.len_utf8();
    let rest = message.get(start..)?;
    let end = rest.find(delimiter)?;
    Some(rest[..end].to_string())
}
