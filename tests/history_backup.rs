mod common;

use std::fs;
use std::sync::Arc;

use common::{OPENAI_ANSWER, RecordingTransport};
use kotoba_session::backup::{HistoryBackup, JsonFileBackup};
use kotoba_session::engine::ConversationEngine;
use kotoba_session::{Credential, LLMError, Message, ProviderConfig, ProviderKind};

fn engine_at(
    transport: &Arc<RecordingTransport>,
    path: &std::path::Path,
    system_prompt: &str,
) -> Result<ConversationEngine, LLMError> {
    ConversationEngine::builder(ProviderConfig::new(ProviderKind::OpenAi).with_model("gpt-4"))
        .system_prompt(system_prompt)
        .backup_path(path)
        .transport(transport.clone())
        .credential(ProviderKind::OpenAi, Credential::api_key("sk-test"))
        .build()
}

#[tokio::test]
async fn backup_is_written_after_each_exchange_and_reloaded() {
    let transport = RecordingTransport::new();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("chat_history.json");

    let mut engine = engine_at(&transport, &path, "be brief").expect("engine");
    assert!(!path.exists());
    engine.chat_with_history("first", None).await.expect("turn");
    engine.chat_with_history("second", None).await.expect("turn");

    let saved = JsonFileBackup::new(&path).load().expect("load");
    assert_eq!(saved.as_deref(), Some(engine.history().messages()));

    let restored = engine_at(&transport, &path, "a different prompt").expect("engine");
    assert_eq!(restored.history(), engine.history());
    assert_eq!(restored.history().messages()[0], Message::system("be brief"));
    assert_eq!(
        restored.history().last(),
        Some(&Message::assistant(OPENAI_ANSWER))
    );
}

#[tokio::test]
async fn single_shot_calls_never_touch_the_backup() {
    let transport = RecordingTransport::new();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("chat_history.json");

    let engine = engine_at(&transport, &path, "be brief").expect("engine");
    engine.chat_once("hello").await.expect("reply");
    assert!(!path.exists());
}

#[test]
fn corrupt_backup_fails_construction() {
    let transport = RecordingTransport::new();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("chat_history.json");
    fs::write(&path, "[{\"role\":").expect("write");

    assert!(matches!(
        engine_at(&transport, &path, "be brief"),
        Err(LLMError::Backup { .. })
    ));
}

struct ReadOnlyBackup;

impl HistoryBackup for ReadOnlyBackup {
    fn load(&self) -> Result<Option<Vec<Message>>, LLMError> {
        Ok(Some(vec![Message::system("restored")]))
    }

    fn save(&self, _messages: &[Message]) -> Result<(), LLMError> {
        Err(LLMError::Backup {
            path: "memory".to_string(),
            message: "read-only".to_string(),
        })
    }
}

#[tokio::test]
async fn save_failures_are_reported_after_the_reply_is_recorded() {
    let transport = RecordingTransport::new();
    let mut engine = ConversationEngine::builder(ProviderConfig::new(ProviderKind::OpenAi).with_model("gpt-4"))
        .backup(ReadOnlyBackup)
        .transport(transport.clone())
        .credential(ProviderKind::OpenAi, Credential::api_key("sk-test"))
        .build()
        .expect("engine");
    assert_eq!(engine.history().messages(), &[Message::system("restored")]);

    let err = engine.chat_with_history("hi", None).await.expect_err("save fails");
    assert!(matches!(err, LLMError::Backup { .. }));
    assert_eq!(engine.history().len(), 3);
}
