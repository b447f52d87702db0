//! Anthropic Messages (Claude) adapter.
//!
//! Claude receives every turn as a single flattened text string; image blocks are not
//! forwarded.

mod adapter;
mod error;
mod request;
mod response;
mod types;

pub use adapter::AnthropicMessagesAdapter;
