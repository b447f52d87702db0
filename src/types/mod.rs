//! Canonical conversation types shared by every provider adapter.
//!
//! The serialized form follows the OpenAI chat wire shape, so a persisted history is a
//! plain JSON array of chat messages that other tools can read back.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire string for the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One conversation turn in provider-agnostic form.
///
/// # Examples
///
/// ```
/// # use kotoba_session::types::{ContentBlock, ImageDetail, Message, Role};
/// let msg = Message::user_blocks(vec![
///     ContentBlock::text("Describe this image"),
///     ContentBlock::image("https://example.com/img.png", ImageDetail::High),
/// ]);
/// assert_eq!(msg.role, Role::User);
/// assert_eq!(msg.image_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

/// Message body: either a bare string or an ordered list of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// Tagged piece of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(rename = "image_url")]
    Image {
        image_url: ImageRef,
    },
}

/// Image reference carried by [`ContentBlock::Image`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Remote URL or `data:` URI.
    pub url: String,
    #[serde(default)]
    pub detail: ImageDetail,
}

/// Detail preset requested for image inspection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageDetail {
    Low,
    #[default]
    High,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>, detail: ImageDetail) -> Self {
        ContentBlock::Image {
            image_url: ImageRef {
                url: url.into(),
                detail,
            },
        }
    }

    /// Wire tag of the block (`text` or `image_url`).
    pub fn type_tag(&self) -> &'static str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::Image { .. } => "image_url",
        }
    }
}

impl Message {
    pub fn new(role: Role, content: MessageContent) -> Self {
        Self { role, content }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, MessageContent::Text(text.into()))
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, MessageContent::Text(text.into()))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, MessageContent::Text(text.into()))
    }

    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self::new(Role::User, MessageContent::Blocks(blocks))
    }

    /// Iterates over the text fragments of the message in order.
    pub fn text_parts(&self) -> Vec<&str> {
        match &self.content {
            MessageContent::Text(text) => vec![text.as_str()],
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::Image { .. } => None,
                })
                .collect(),
        }
    }

    /// All text fragments joined with newlines; image blocks are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kotoba_session::types::{ContentBlock, ImageDetail, Message};
    /// let msg = Message::user_blocks(vec![
    ///     ContentBlock::text("first"),
    ///     ContentBlock::image("https://example.com/a.png", ImageDetail::Low),
    ///     ContentBlock::text("second"),
    /// ]);
    /// assert_eq!(msg.flattened_text(), "first\nsecond");
    /// ```
    pub fn flattened_text(&self) -> String {
        self.text_parts().join("\n")
    }

    pub fn image_count(&self) -> usize {
        match &self.content {
            MessageContent::Text(_) => 0,
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter(|block| matches!(block, ContentBlock::Image { .. }))
                .count(),
        }
    }
}

/// Per-dispatch options resolved by the engine from its [`crate::config::ProviderConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOptions {
    pub model: String,
    pub max_output_tokens: u32,
}

/// Canonical reply extracted from a provider response.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Role reported by the provider (assistant for every current vendor).
    pub role: Role,
    pub text: String,
    /// Model identifier echoed by the provider, when present.
    pub model: Option<String>,
    pub usage: Option<TokenUsage>,
    /// Provider identifier such as `openai_chat`.
    pub provider: &'static str,
    /// Visible non-fatal conditions, for example images the provider had to drop.
    pub warnings: Vec<String>,
}

impl Reply {
    /// Converts the reply into the history message that records it.
    pub fn to_message(&self) -> Message {
        Message::new(self.role, MessageContent::Text(self.text.clone()))
    }
}

/// Token usage reported by the vendor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

/// Capability descriptor used to gate operations at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    /// Whether image inputs are forwarded to the model.
    pub supports_image_input: bool,
    /// Whether prior turns are sent as structured multi-turn history.
    pub supports_structured_history: bool,
    /// Whether a system message is honoured as an instruction.
    pub supports_system_prompt: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_serializes_in_chat_wire_shape() {
        let msg = Message::user_blocks(vec![
            ContentBlock::text("hello"),
            ContentBlock::image("data:image/jpeg;base64,AAAA", ImageDetail::High),
        ]);
        let value = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "hello"},
                    {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,AAAA", "detail": "high"}}
                ]
            })
        );
    }

    #[test]
    fn message_accepts_plain_string_content() {
        let msg: Message =
            serde_json::from_value(json!({"role": "assistant", "content": "hi there"}))
                .expect("deserialize");
        assert_eq!(msg, Message::assistant("hi there"));
    }

    #[test]
    fn missing_image_detail_defaults_to_high() {
        let block: ContentBlock = serde_json::from_value(
            json!({"type": "image_url", "image_url": {"url": "https://x/y.png"}}),
        )
        .expect("deserialize");
        assert_eq!(
            block,
            ContentBlock::image("https://x/y.png", ImageDetail::High)
        );
    }

    #[test]
    fn flattened_text_of_plain_message_is_the_text() {
        assert_eq!(Message::system("be brief").flattened_text(), "be brief");
        assert_eq!(Message::system("be brief").image_count(), 0);
    }
}
