use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::error::LLMError;
use crate::http::{DynHttpTransport, post_json_with_headers};
use crate::provider::{ProviderAdapter, dropped_images_warning, ensure_model};
use crate::types::{CapabilityDescriptor, ChatOptions, Message, Reply};

use super::error::parse_anthropic_error;
use super::request::build_anthropic_body;
use super::response::map_response;
use super::types::AnthropicMessageResponse;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_VERSION: &str = "2023-06-01";

/// Anthropic Messages adapter (Claude 3.x Messages API).
pub struct AnthropicMessagesAdapter {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) version: String,
}

impl AnthropicMessagesAdapter {
    /// Creates an adapter pinned to the `2023-06-01` API version.
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            version: DEFAULT_VERSION.to_string(),
        }
    }

    /// Points the adapter at a proxy or compatibility layer.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/messages")
        } else {
            format!("{base}/v1/messages")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            ("x-api-key".to_string(), self.api_key.clone()),
            ("anthropic-version".to_string(), self.version.clone()),
            ("Accept".to_string(), "application/json".to_string()),
        ])
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicMessagesAdapter {
    async fn send_once(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<Reply, LLMError> {
        ensure_model(&options.model, self.name())?;
        let body = build_anthropic_body(messages, options);
        let warning = dropped_images_warning(self.name(), body.dropped_images);
        debug!(model = %options.model, turns = body.request.messages.len(), "sending messages request");

        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.endpoint(),
            self.build_headers(),
            &body.request,
        )
        .await?;
        let text = response.into_success_text(parse_anthropic_error)?;
        let parsed: AnthropicMessageResponse = serde_json::from_str(&text).map_err(|err| {
            LLMError::provider(
                self.name(),
                format!("failed to parse Anthropic response: {err}"),
            )
        })?;

        let mut reply = map_response(parsed, self.name())?;
        reply.warnings.extend(warning);
        Ok(reply)
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            // Turns are flattened to text, so image blocks never reach the model.
            supports_image_input: false,
            supports_structured_history: true,
            supports_system_prompt: true,
        }
    }

    fn name(&self) -> &'static str {
        "anthropic_messages"
    }
}
