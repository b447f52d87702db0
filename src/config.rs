use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::LLMError;
use crate::http::DynHttpTransport;
use crate::provider::DynAdapter;
use crate::provider::anthropic_messages::AnthropicMessagesAdapter;
use crate::provider::google_gemini::GoogleGeminiAdapter;
use crate::provider::openai_chat::OpenAiChatAdapter;

/// Context budget applied when none is configured.
pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 128_000;
/// Completion budget applied when none is configured.
pub const DEFAULT_MAX_RESPONSE_TOKENS: u32 = 4096;

/// Supported vendor families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Claude,
    Gemini,
}

impl ProviderKind {
    /// Model used when the caller does not pick one.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::Claude => "claude-3-opus-20240229",
            ProviderKind::Gemini => "gemini-1.5-pro",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Claude => "ANTHROPIC_API_KEY",
            ProviderKind::Gemini => "GOOGLE_API_KEY",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Claude => "claude",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Adapter identifier, as reported by [`crate::provider::ProviderAdapter::name`].
    pub fn adapter_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai_chat",
            ProviderKind::Claude => "anthropic_messages",
            ProviderKind::Gemini => "google_gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LLMError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            _ => Err(LLMError::UnknownProvider {
                name: value.to_string(),
            }),
        }
    }
}

/// Session-level provider settings.
///
/// Replaced wholesale when the provider is switched; the conversation history lives
/// elsewhere and survives the switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub model: String,
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
    #[serde(default = "default_max_response_tokens")]
    pub max_response_tokens: u32,
}

fn default_max_context_tokens() -> usize {
    DEFAULT_MAX_CONTEXT_TOKENS
}

fn default_max_response_tokens() -> u32 {
    DEFAULT_MAX_RESPONSE_TOKENS
}

impl ProviderConfig {
    /// Config for `provider` with its default model and the default budgets.
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            max_context_tokens: DEFAULT_MAX_CONTEXT_TOKENS,
            max_response_tokens: DEFAULT_MAX_RESPONSE_TOKENS,
        }
    }

    /// Parses the provider name first.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kotoba_session::config::{ProviderConfig, ProviderKind};
    /// let config = ProviderConfig::from_name("claude").unwrap();
    /// assert_eq!(config.provider, ProviderKind::Claude);
    /// assert_eq!(config.model, "claude-3-opus-20240229");
    /// assert!(ProviderConfig::from_name("mistral").is_err());
    /// ```
    pub fn from_name(name: &str) -> Result<Self, LLMError> {
        Ok(Self::new(name.parse()?))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_context_tokens(mut self, tokens: usize) -> Self {
        self.max_context_tokens = tokens;
        self
    }

    pub fn with_max_response_tokens(mut self, tokens: u32) -> Self {
        self.max_response_tokens = tokens;
        self
    }

    /// Same budgets for a different provider; `model` falls back to the provider default.
    pub fn switched_to(&self, provider: ProviderKind, model: Option<String>) -> Self {
        Self {
            provider,
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            max_context_tokens: self.max_context_tokens,
            max_response_tokens: self.max_response_tokens,
        }
    }
}

/// Authentication material for a provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    ApiKey { key: String },
    None,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiKey { .. } => f.write_str("ApiKey { key: <redacted> }"),
            Credential::None => f.write_str("None"),
        }
    }
}

impl Credential {
    pub fn api_key(key: impl Into<String>) -> Self {
        Credential::ApiKey { key: key.into() }
    }

    /// Reads the provider's API key variable; unset or blank yields [`Credential::None`].
    pub fn from_env(provider: ProviderKind) -> Self {
        match env::var(provider.api_key_env()) {
            Ok(key) if !key.trim().is_empty() => Credential::ApiKey { key },
            _ => Credential::None,
        }
    }
}

/// Builds the adapter matching `config.provider`.
///
/// # Errors
///
/// Returns [`LLMError::ClientUnavailable`] when no usable credential is present.
pub fn build_adapter(
    config: &ProviderConfig,
    credential: &Credential,
    transport: DynHttpTransport,
    base_url: Option<&str>,
) -> Result<DynAdapter, LLMError> {
    let api_key = extract_api_key(credential, config.provider)?;
    let adapter: DynAdapter = match config.provider {
        ProviderKind::OpenAi => {
            let mut adapter = OpenAiChatAdapter::new(transport, api_key);
            if let Some(base_url) = base_url {
                adapter = adapter.with_base_url(base_url);
            }
            Arc::new(adapter)
        }
        ProviderKind::Claude => {
            let mut adapter = AnthropicMessagesAdapter::new(transport, api_key);
            if let Some(base_url) = base_url {
                adapter = adapter.with_base_url(base_url);
            }
            Arc::new(adapter)
        }
        ProviderKind::Gemini => {
            let mut adapter = GoogleGeminiAdapter::new(transport, api_key);
            if let Some(base_url) = base_url {
                adapter = adapter.with_base_url(base_url);
            }
            Arc::new(adapter)
        }
    };
    Ok(adapter)
}

fn extract_api_key(credential: &Credential, provider: ProviderKind) -> Result<String, LLMError> {
    match credential {
        Credential::ApiKey { key } if !key.trim().is_empty() => Ok(key.clone()),
        Credential::ApiKey { .. } => Err(LLMError::ClientUnavailable {
            provider: provider.adapter_name(),
            reason: "API key is blank".to_string(),
        }),
        Credential::None => Err(LLMError::ClientUnavailable {
            provider: provider.adapter_name(),
            reason: format!("{} is not set", provider.api_key_env()),
        }),
    }
}
