//! Conversation orchestration.
//!
//! [`ConversationEngine`] owns one history and one provider configuration. Each call
//! runs to completion before the next may start; history-mutating calls take
//! `&mut self`.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::backup::{HistoryBackup, JsonFileBackup};
use crate::config::{Credential, ProviderConfig, ProviderKind, build_adapter};
use crate::error::LLMError;
use crate::history::HistoryStore;
use crate::http::DynHttpTransport;
use crate::http::reqwest::default_dyn_transport;
use crate::image::ImageInput;
use crate::provider::DynAdapter;
use crate::tokens::TokenEstimator;
use crate::types::{ChatOptions, ContentBlock, Message, Reply};

/// Prompt used by [`ConversationEngine::analyze_image`] when the caller gives none.
pub const DEFAULT_IMAGE_PROMPT: &str = "Please give me a detailed description of this image.";

/// Whether the active provider can be dispatched to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientStatus {
    Ready,
    /// Construction failed; every dispatch returns [`LLMError::ClientUnavailable`].
    Unavailable { reason: String },
}

enum Client {
    Ready(DynAdapter),
    Unavailable(String),
}

/// Builder for [`ConversationEngine`].
///
/// # Examples
///
/// ```no_run
/// # use kotoba_session::config::{ProviderConfig, ProviderKind};
/// # use kotoba_session::engine::ConversationEngine;
/// # async fn run() -> Result<(), kotoba_session::error::LLMError> {
/// let mut engine = ConversationEngine::builder(ProviderConfig::new(ProviderKind::OpenAi))
///     .system_prompt("You are a concise assistant.")
///     .backup_path("chat_history.json")
///     .build()?;
///
/// let reply = engine.chat_with_history("What is a borrow checker?", None).await?;
/// println!("{}", reply.text);
/// # Ok(())
/// # }
/// ```
pub struct ConversationEngineBuilder {
    config: ProviderConfig,
    system_prompt: Option<String>,
    backup: Option<Box<dyn HistoryBackup>>,
    transport: Option<DynHttpTransport>,
    credentials: HashMap<ProviderKind, Credential>,
    base_urls: HashMap<ProviderKind, String>,
    estimator: Option<TokenEstimator>,
}

impl ConversationEngineBuilder {
    /// Leading instruction message, used only when no backup is loaded.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Persists the history as JSON at `path`.
    pub fn backup_path(self, path: impl Into<std::path::PathBuf>) -> Self {
        self.backup(JsonFileBackup::new(path))
    }

    pub fn backup(mut self, backup: impl HistoryBackup + 'static) -> Self {
        self.backup = Some(Box::new(backup));
        self
    }

    /// Replaces the reqwest transport, typically with a test double.
    pub fn transport(mut self, transport: DynHttpTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Overrides the credential otherwise read from the provider's environment variable.
    pub fn credential(mut self, provider: ProviderKind, credential: Credential) -> Self {
        self.credentials.insert(provider, credential);
        self
    }

    pub fn base_url(mut self, provider: ProviderKind, base_url: impl Into<String>) -> Self {
        self.base_urls.insert(provider, base_url.into());
        self
    }

    pub fn token_estimator(mut self, estimator: TokenEstimator) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Loads the backup (if any) and constructs the active adapter.
    ///
    /// A missing credential does not fail the build; it leaves the engine in
    /// [`ClientStatus::Unavailable`].
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::Backup`] when an existing backup cannot be read, or
    /// [`LLMError::Transport`] when the default HTTP client cannot be created.
    pub fn build(self) -> Result<ConversationEngine, LLMError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_dyn_transport()?,
        };

        let loaded = match &self.backup {
            Some(backup) => backup.load()?,
            None => None,
        };
        let history = match (loaded, self.system_prompt) {
            (Some(messages), _) => {
                info!(messages = messages.len(), "restored conversation from backup");
                HistoryStore::from(messages)
            }
            (None, Some(prompt)) => HistoryStore::from(vec![Message::system(prompt)]),
            (None, None) => HistoryStore::new(),
        };

        let mut engine = ConversationEngine {
            config: self.config,
            history,
            estimator: self.estimator.unwrap_or_default(),
            client: Client::Unavailable(String::new()),
            transport,
            credentials: self.credentials,
            base_urls: self.base_urls,
            backup: self.backup,
        };
        engine.client = engine.connect();
        Ok(engine)
    }
}

/// Single-threaded conversation session over one provider at a time.
pub struct ConversationEngine {
    config: ProviderConfig,
    history: HistoryStore,
    estimator: TokenEstimator,
    client: Client,
    transport: DynHttpTransport,
    credentials: HashMap<ProviderKind, Credential>,
    base_urls: HashMap<ProviderKind, String>,
    backup: Option<Box<dyn HistoryBackup>>,
}

impl ConversationEngine {
    pub fn builder(config: ProviderConfig) -> ConversationEngineBuilder {
        ConversationEngineBuilder {
            config,
            system_prompt: None,
            backup: None,
            transport: None,
            credentials: HashMap::new(),
            base_urls: HashMap::new(),
            estimator: None,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn client_status(&self) -> ClientStatus {
        match &self.client {
            Client::Ready(_) => ClientStatus::Ready,
            Client::Unavailable(reason) => ClientStatus::Unavailable {
                reason: reason.clone(),
            },
        }
    }

    /// Current token length of the history for the active provider and model.
    pub fn history_tokens(&self) -> Result<usize, LLMError> {
        self.estimate(self.history.messages())
    }

    /// Asks a single question without reading or touching the history.
    ///
    /// Returns `Ok(None)` for an empty prompt; nothing is sent in that case.
    ///
    /// # Errors
    ///
    /// [`LLMError::PromptTooLarge`] when the prompt alone exceeds the context budget,
    /// [`LLMError::ClientUnavailable`] when the provider could not be set up, plus any
    /// vendor or transport error.
    pub async fn chat_once(&self, prompt: &str) -> Result<Option<Reply>, LLMError> {
        if prompt.is_empty() {
            info!("didn't receive input, skipping request");
            return Ok(None);
        }
        let adapter = self.adapter()?;
        let question = [Message::user(prompt)];
        let estimated = self.estimate(&question)?;
        if estimated > self.config.max_context_tokens {
            return Err(LLMError::PromptTooLarge {
                estimated,
                limit: self.config.max_context_tokens,
            });
        }

        info!(provider = %self.config.provider, model = %self.config.model, "asking {} a question", self.config.provider);
        let reply = adapter.send_once(&question, &self.options()).await?;
        debug!(chars = reply.text.len(), "received answer");
        Ok(Some(reply))
    }

    /// Multi-turn exchange over the stored history.
    ///
    /// A non-empty `prompt` becomes a new user turn (with `image` attached at high
    /// detail); an empty prompt re-sends the current history as a "continue". The
    /// history is truncated to the context budget before dispatch, the reply is
    /// appended, and the backup is rewritten.
    ///
    /// The new turn and truncation are committed together: on
    /// [`LLMError::HistoryExhausted`] (or an estimation failure) the history is left
    /// exactly as it was. Failures after that point keep the committed user turn.
    pub async fn chat_with_history(
        &mut self,
        prompt: &str,
        image: Option<ImageInput>,
    ) -> Result<Reply, LLMError> {
        let adapter = self.adapter()?;

        let mut candidate = self.history.clone();
        if prompt.is_empty() {
            if image.is_some() {
                warn!("image ignored: attaching an image requires a prompt");
            }
        } else {
            let mut blocks = vec![ContentBlock::text(prompt)];
            if let Some(image) = &image {
                blocks.push(image.to_block()?);
            }
            candidate.append(Message::user_blocks(blocks));
        }

        let current = self.estimate(candidate.messages())?;
        debug!(tokens = current, "chat history token length");
        let max_tokens = self.config.max_context_tokens;
        let (estimator, provider, model) = (&self.estimator, self.config.provider, &self.config.model);
        let tokens =
            candidate.truncate_to_budget(max_tokens, |messages| estimator.estimate(messages, provider, model))?;
        self.history = candidate;

        info!(provider = %self.config.provider, model = %self.config.model, tokens, "asking {} a question", self.config.provider);
        let reply = adapter
            .send_once(self.history.messages(), &self.options())
            .await?;
        self.history.append(reply.to_message());
        self.save_backup()?;
        Ok(reply)
    }

    /// Single-shot image understanding; the history is not involved.
    ///
    /// # Errors
    ///
    /// [`LLMError::CapabilityUnsupported`] when the active provider drops images, and
    /// [`LLMError::ImageEncoding`] when a local image cannot be read. Both are raised
    /// before anything is sent.
    pub async fn analyze_image(
        &self,
        prompt: Option<&str>,
        image: ImageInput,
    ) -> Result<Reply, LLMError> {
        let adapter = self.adapter()?;
        if !adapter.supports_images() {
            return Err(LLMError::CapabilityUnsupported {
                provider: adapter.name(),
                capability: "image analysis",
            });
        }
        let prompt = prompt
            .filter(|prompt| !prompt.is_empty())
            .unwrap_or(DEFAULT_IMAGE_PROMPT);
        let message = Message::user_blocks(vec![ContentBlock::text(prompt), image.to_block()?]);

        info!(provider = %self.config.provider, model = %self.config.model, "asking {} to analyze image", self.config.provider);
        adapter.send_once(&[message], &self.options()).await
    }

    /// Switches vendor while keeping the history and token budgets.
    ///
    /// `model` falls back to the provider's default. A missing credential leaves the
    /// engine in [`ClientStatus::Unavailable`] rather than failing the switch.
    pub fn set_provider(&mut self, provider: ProviderKind, model: Option<String>) {
        self.config = self.config.switched_to(provider, model);
        self.client = self.connect();
        info!(provider = %self.config.provider, model = %self.config.model, "switched provider");
    }

    /// [`ConversationEngine::set_provider`] by name.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::UnknownProvider`] when `name` is not a supported vendor; the
    /// current provider stays active.
    pub fn set_provider_by_name(&mut self, name: &str, model: Option<String>) -> Result<(), LLMError> {
        let provider: ProviderKind = name.parse()?;
        self.set_provider(provider, model);
        Ok(())
    }

    fn connect(&self) -> Client {
        let provider = self.config.provider;
        let credential = self
            .credentials
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| Credential::from_env(provider));
        let base_url = self.base_urls.get(&provider).map(String::as_str);
        match build_adapter(&self.config, &credential, self.transport.clone(), base_url) {
            Ok(adapter) => Client::Ready(adapter),
            Err(err) => {
                warn!(provider = %provider, error = %err, "provider client unavailable");
                Client::Unavailable(match err {
                    LLMError::ClientUnavailable { reason, .. } => reason,
                    other => other.to_string(),
                })
            }
        }
    }

    fn adapter(&self) -> Result<DynAdapter, LLMError> {
        match &self.client {
            Client::Ready(adapter) => Ok(adapter.clone()),
            Client::Unavailable(reason) => Err(LLMError::ClientUnavailable {
                provider: self.config.provider.adapter_name(),
                reason: reason.clone(),
            }),
        }
    }

    fn options(&self) -> ChatOptions {
        ChatOptions {
            model: self.config.model.clone(),
            max_output_tokens: self.config.max_response_tokens,
        }
    }

    fn estimate(&self, messages: &[Message]) -> Result<usize, LLMError> {
        self.estimator
            .estimate(messages, self.config.provider, &self.config.model)
    }

    fn save_backup(&self) -> Result<(), LLMError> {
        match &self.backup {
            Some(backup) => backup.save(self.history.messages()),
            None => Ok(()),
        }
    }
}
