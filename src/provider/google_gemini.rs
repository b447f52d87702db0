//! Google Gemini GenerateContent adapter.
//!
//! Gemini is driven as a single-prompt endpoint: the prompt replays the text of every
//! user turn and leaves assistant turns out. This discards model-side context on each
//! call; it is a known limitation kept for parity with existing sessions.

mod adapter;
mod error;
mod request;
mod response;
mod types;

pub use adapter::GoogleGeminiAdapter;
pub use request::build_gemini_prompt;
