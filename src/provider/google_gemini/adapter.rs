use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::error::LLMError;
use crate::http::{DynHttpTransport, post_json_with_headers};
use crate::provider::{ProviderAdapter, dropped_images_warning, ensure_model};
use crate::types::{CapabilityDescriptor, ChatOptions, Message, Reply};

use super::error::parse_gemini_error;
use super::request::build_gemini_body;
use super::response::map_response;
use super::types::GeminiGenerateContentResponse;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini GenerateContent adapter.
pub struct GoogleGeminiAdapter {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
}

impl GoogleGeminiAdapter {
    /// Creates an adapter that targets the default Generative Language endpoint.
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Overrides the base URL, making it easier to point at proxies or compatibility layers.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) fn endpoint(&self, model: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let model = model.trim_start_matches("models/");
        if base.ends_with("/v1beta") {
            format!("{base}/models/{model}:generateContent")
        } else {
            format!("{base}/v1beta/models/{model}:generateContent")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            ("x-goog-api-key".to_string(), self.api_key.clone()),
            ("Accept".to_string(), "application/json".to_string()),
        ])
    }
}

#[async_trait]
impl ProviderAdapter for GoogleGeminiAdapter {
    async fn send_once(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<Reply, LLMError> {
        ensure_model(&options.model, self.name())?;
        let body = build_gemini_body(messages, options)?;
        let warning = dropped_images_warning(self.name(), body.dropped_images);
        debug!(model = %options.model, "sending generateContent request");

        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.endpoint(&options.model),
            self.build_headers(),
            &body.request,
        )
        .await?;
        let text = response.into_success_text(parse_gemini_error)?;
        let parsed: GeminiGenerateContentResponse = serde_json::from_str(&text).map_err(|err| {
            LLMError::provider(self.name(), format!("failed to parse Gemini response: {err}"))
        })?;

        let mut reply = map_response(parsed, self.name())?;
        if reply.model.is_none() {
            reply.model = Some(options.model.clone());
        }
        reply.warnings.extend(warning);
        Ok(reply)
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_image_input: false,
            supports_structured_history: false,
            supports_system_prompt: false,
        }
    }

    fn name(&self) -> &'static str {
        "google_gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::reqwest::default_dyn_transport;

    #[test]
    fn endpoint_normalizes_model_prefix_and_version() {
        let adapter = GoogleGeminiAdapter::new(default_dyn_transport().expect("transport"), "k");
        assert_eq!(
            adapter.endpoint("models/gemini-1.5-pro"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent"
        );

        let proxied = adapter.with_base_url("http://localhost:8080/v1beta/");
        assert_eq!(
            proxied.endpoint("gemini-1.5-flash"),
            "http://localhost:8080/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
