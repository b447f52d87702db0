//! OpenAI Chat Completions adapter.
//!
//! Canonical messages already use the Chat Completions shape, so they are sent as-is.

mod adapter;
mod error;
mod request;
mod response;
mod types;

pub use adapter::OpenAiChatAdapter;
