use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::LLMError;
use crate::types::{CapabilityDescriptor, ChatOptions, Message, Reply};

pub mod anthropic_messages;
pub mod google_gemini;
pub mod openai_chat;

/// Translation layer between canonical messages and one vendor API.
///
/// Every vendor family implements this trait once; the engine picks the implementation
/// from [`crate::config::ProviderKind`] and never branches on the vendor itself.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Sends `messages` as a single request and waits for the complete reply.
    async fn send_once(&self, messages: &[Message], options: &ChatOptions)
    -> Result<Reply, LLMError>;

    /// Describes what the vendor accepts.
    fn capabilities(&self) -> CapabilityDescriptor;

    /// Whether image blocks reach the model instead of being dropped.
    fn supports_images(&self) -> bool {
        self.capabilities().supports_image_input
    }

    /// Adapter identifier such as `openai_chat`.
    fn name(&self) -> &'static str;
}

/// Thread-safe adapter handle.
pub type DynAdapter = Arc<dyn ProviderAdapter>;

/// Reports image blocks an adapter could not forward.
///
/// Returns the warning text that belongs in [`Reply::warnings`], or `None` when
/// nothing was dropped.
pub(crate) fn dropped_images_warning(provider: &'static str, dropped: usize) -> Option<String> {
    if dropped == 0 {
        return None;
    }
    let message = format!("images not supported for {provider}: dropped {dropped} image block(s)");
    warn!(provider, dropped, "{message}");
    Some(message)
}

pub(crate) fn ensure_model(model: &str, provider: &'static str) -> Result<(), LLMError> {
    if model.trim().is_empty() {
        return Err(LLMError::Validation {
            message: format!("model is required for {provider}"),
        });
    }
    Ok(())
}
