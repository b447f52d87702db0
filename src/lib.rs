//! One conversation surface over OpenAI, Claude and Gemini, with token-budgeted history.

pub mod backup;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod http;
pub mod image;
pub mod provider;
pub mod tokens;
pub mod types;

pub use config::{Credential, ProviderConfig, ProviderKind};
pub use engine::{ClientStatus, ConversationEngine};
pub use error::LLMError;
pub use image::ImageInput;
pub use provider::ProviderAdapter;
pub use types::*;
