//! Token accounting for conversation windows.
//!
//! OpenAI-style providers are counted exactly with the model's BPE encoding. Claude and
//! Gemini have no public offline tokenizer, so their counts are a character heuristic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tiktoken_rs::{CoreBPE, get_bpe_from_model};

use crate::config::ProviderKind;
use crate::error::LLMError;
use crate::types::{ContentBlock, Message, MessageContent};

/// Framing tokens charged for every message.
pub const TOKENS_PER_MESSAGE: usize = 4;
/// Tokens that prime the assistant reply, charged once per sequence.
pub const REPLY_PRIMING_TOKENS: usize = 2;
/// Flat cost of one high-detail image block.
pub const DEFAULT_IMAGE_TOKEN_COST: usize = 1105;
/// Characters per token for the approximate estimate.
pub const APPROX_CHARS_PER_TOKEN: usize = 4;

/// Provider-aware token estimator with a per-model encoder cache.
///
/// # Examples
///
/// ```
/// # use kotoba_session::config::ProviderKind;
/// # use kotoba_session::tokens::TokenEstimator;
/// # use kotoba_session::types::Message;
/// let estimator = TokenEstimator::new();
/// let messages = vec![Message::user("1234567")];
/// // {"role":"user","content":"1234567"} is 35 characters
/// let tokens = estimator.estimate(&messages, ProviderKind::Claude, "claude-3-opus-20240229").unwrap();
/// assert_eq!(tokens, 8);
/// ```
pub struct TokenEstimator {
    image_token_cost: usize,
    encoders: Mutex<HashMap<String, Arc<CoreBPE>>>,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenEstimator {
    pub fn new() -> Self {
        Self {
            image_token_cost: DEFAULT_IMAGE_TOKEN_COST,
            encoders: Mutex::new(HashMap::new()),
        }
    }

    /// Overrides the flat per-image cost used for exact counts.
    pub fn with_image_token_cost(mut self, cost: usize) -> Self {
        self.image_token_cost = cost;
        self
    }

    pub fn image_token_cost(&self) -> usize {
        self.image_token_cost
    }

    /// Counts tokens for `messages` as `provider` would bill them for `model`.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::UnsupportedModel`] when `provider` is OpenAI and no encoding
    /// is known for `model`.
    pub fn estimate(
        &self,
        messages: &[Message],
        provider: ProviderKind,
        model: &str,
    ) -> Result<usize, LLMError> {
        match provider {
            ProviderKind::OpenAi => self.estimate_exact(messages, model),
            ProviderKind::Claude | ProviderKind::Gemini => Ok(Self::estimate_approx(messages)),
        }
    }

    fn estimate_exact(&self, messages: &[Message], model: &str) -> Result<usize, LLMError> {
        let encoder = self.encoder_for(model)?;
        let count = |text: &str| encoder.encode_ordinary(text).len();

        let mut total = 0usize;
        for message in messages {
            total += TOKENS_PER_MESSAGE;
            total += count(message.role.as_str());
            match &message.content {
                MessageContent::Text(text) => total += count(text),
                MessageContent::Blocks(blocks) => {
                    for block in blocks {
                        total += count(block.type_tag());
                        match block {
                            ContentBlock::Text { text } => total += count(text),
                            ContentBlock::Image { .. } => total += self.image_token_cost,
                        }
                    }
                }
            }
        }
        Ok(total + REPLY_PRIMING_TOKENS)
    }

    fn estimate_approx(messages: &[Message]) -> usize {
        messages
            .iter()
            .map(|message| {
                serde_json::to_string(message)
                    .unwrap_or_default()
                    .chars()
                    .count()
                    / APPROX_CHARS_PER_TOKEN
            })
            .sum()
    }

    fn encoder_for(&self, model: &str) -> Result<Arc<CoreBPE>, LLMError> {
        let mut encoders = self
            .encoders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(encoder) = encoders.get(model) {
            return Ok(encoder.clone());
        }
        let encoder = get_bpe_from_model(model).map_err(|err| LLMError::UnsupportedModel {
            model: model.to_string(),
            reason: err.to_string(),
        })?;
        let encoder = Arc::new(encoder);
        encoders.insert(model.to_string(), encoder.clone());
        Ok(encoder)
    }
}
