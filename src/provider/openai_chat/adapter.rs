use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::error::LLMError;
use crate::http::{DynHttpTransport, post_json_with_headers};
use crate::provider::{ProviderAdapter, ensure_model};
use crate::types::{CapabilityDescriptor, ChatOptions, Message, Reply};

use super::error::parse_openai_error;
use super::request::build_openai_body;
use super::response::map_response;
use super::types::OpenAiChatResponse;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI Chat Completions adapter.
pub struct OpenAiChatAdapter {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
}

impl OpenAiChatAdapter {
    /// Creates an adapter for the public OpenAI endpoint.
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Points the adapter at a proxy or an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            ("Authorization".to_string(), format!("Bearer {}", self.api_key)),
            ("Accept".to_string(), "application/json".to_string()),
        ])
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiChatAdapter {
    async fn send_once(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<Reply, LLMError> {
        ensure_model(&options.model, self.name())?;
        let body = build_openai_body(messages, options);
        debug!(model = %options.model, messages = messages.len(), "sending chat completion");
        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.endpoint(),
            self.build_headers(),
            &body,
        )
        .await?;
        let text = response.into_success_text(parse_openai_error)?;
        let parsed: OpenAiChatResponse = serde_json::from_str(&text).map_err(|err| {
            LLMError::provider(self.name(), format!("failed to parse OpenAI response: {err}"))
        })?;
        map_response(parsed, self.name())
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_image_input: true,
            supports_structured_history: true,
            supports_system_prompt: true,
        }
    }

    fn name(&self) -> &'static str {
        "openai_chat"
    }
}
