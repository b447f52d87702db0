use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LLMError;
use crate::types::Message;

/// Smallest history that truncation may leave behind: the leading message plus one turn.
const MIN_RETAINED_MESSAGES: usize = 2;

/// Ordered conversation messages.
///
/// Mutated only by [`HistoryStore::append`] and by front eviction in
/// [`HistoryStore::truncate_to_budget`], which never touches index 0 (the system or
/// instruction message when one is present).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryStore {
    messages: Vec<Message>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Evicts the oldest non-leading messages until the estimate fits `max_tokens`.
    ///
    /// `estimate` is called on the whole history after every eviction. Returns the
    /// final estimate.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::HistoryExhausted`] once two or fewer messages remain and the
    /// history is still over budget. Messages evicted before that point stay evicted;
    /// callers that need all-or-nothing semantics truncate a clone.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kotoba_session::history::HistoryStore;
    /// # use kotoba_session::types::Message;
    /// let mut history = HistoryStore::from(vec![
    ///     Message::system("s"),
    ///     Message::user("old"),
    ///     Message::user("new"),
    /// ]);
    /// let remaining = history
    ///     .truncate_to_budget(2, |messages| Ok(messages.len()))
    ///     .unwrap();
    /// assert_eq!(remaining, 2);
    /// assert_eq!(history.messages()[1], Message::user("new"));
    /// ```
    pub fn truncate_to_budget<F>(&mut self, max_tokens: usize, mut estimate: F) -> Result<usize, LLMError>
    where
        F: FnMut(&[Message]) -> Result<usize, LLMError>,
    {
        let mut tokens = estimate(&self.messages)?;
        while tokens > max_tokens {
            if self.messages.len() <= MIN_RETAINED_MESSAGES {
                return Err(LLMError::HistoryExhausted {
                    remaining: self.messages.len(),
                    estimated: tokens,
                    limit: max_tokens,
                });
            }
            let evicted = self.messages.remove(1);
            tokens = estimate(&self.messages)?;
            debug!(
                role = %evicted.role,
                tokens,
                max_tokens,
                remaining = self.messages.len(),
                "evicted message from history"
            );
        }
        Ok(tokens)
    }
}

impl From<Vec<Message>> for HistoryStore {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
