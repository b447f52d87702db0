use crate::types::{ChatOptions, Message};

use super::types::OpenAiChatRequest;

pub(crate) fn build_openai_body<'a>(
    messages: &'a [Message],
    options: &'a ChatOptions,
) -> OpenAiChatRequest<'a> {
    OpenAiChatRequest {
        model: &options.model,
        messages,
        max_completion_tokens: options.max_output_tokens,
    }
}
