use crate::types::{ChatOptions, Message, Role};

use super::types::{AnthropicMessagesRequest, AnthropicTextMessage};

/// Request body plus the number of image blocks that had to be dropped.
pub(crate) struct AnthropicBody {
    pub(crate) request: AnthropicMessagesRequest,
    pub(crate) dropped_images: usize,
}

/// Flattens canonical messages into Claude's text-only turns.
///
/// System messages are hoisted into the top-level `system` field because the Messages
/// API does not accept a `system` role inside `messages`.
pub(crate) fn build_anthropic_body(messages: &[Message], options: &ChatOptions) -> AnthropicBody {
    let mut system_texts = Vec::new();
    let mut turns = Vec::with_capacity(messages.len());
    let mut dropped_images = 0;

    for message in messages {
        dropped_images += message.image_count();
        let text = message.flattened_text();
        match message.role {
            Role::System => system_texts.push(text),
            Role::User | Role::Assistant => turns.push(AnthropicTextMessage {
                role: message.role.as_str(),
                content: text,
            }),
        }
    }

    AnthropicBody {
        request: AnthropicMessagesRequest {
            model: options.model.clone(),
            max_tokens: options.max_output_tokens,
            system: (!system_texts.is_empty()).then(|| system_texts.join("\n\n")),
            messages: turns,
        },
        dropped_images,
    }
}
