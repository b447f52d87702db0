//! History persistence.
//!
//! The backup is a JSON array of messages in the chat wire shape, rewritten in full
//! after every successful multi-turn exchange.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::LLMError;
use crate::types::Message;

/// Storage for a conversation history.
pub trait HistoryBackup: Send + Sync {
    /// Returns the stored messages, or `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Vec<Message>>, LLMError>;

    /// Replaces the stored messages.
    fn save(&self, messages: &[Message]) -> Result<(), LLMError>;
}

/// [`HistoryBackup`] backed by a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileBackup {
    path: PathBuf,
}

impl JsonFileBackup {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, message: impl ToString) -> LLMError {
        LLMError::Backup {
            path: self.path.display().to_string(),
            message: message.to_string(),
        }
    }
}

impl HistoryBackup for JsonFileBackup {
    fn load(&self) -> Result<Option<Vec<Message>>, LLMError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.error(err)),
        };
        let messages: Vec<Message> = serde_json::from_str(&raw).map_err(|err| self.error(err))?;
        debug!(path = %self.path.display(), messages = messages.len(), "loaded history backup");
        Ok(Some(messages))
    }

    fn save(&self, messages: &[Message]) -> Result<(), LLMError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.error(err))?;
        }
        let json = serde_json::to_string_pretty(messages).map_err(|err| self.error(err))?;
        fs::write(&self.path, json).map_err(|err| self.error(err))?;
        debug!(path = %self.path.display(), messages = messages.len(), "saved history backup");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentBlock, ImageDetail};

    #[test]
    fn round_trip_reproduces_messages() {
        let dir = tempfile::tempdir().expect("temp dir");
        let backup = JsonFileBackup::new(dir.path().join("nested").join("history.json"));
        let messages = vec![
            Message::system("You are helpful."),
            Message::user_blocks(vec![
                ContentBlock::text("what is this?"),
                ContentBlock::image("data:image/jpeg;base64,QUJD", ImageDetail::High),
            ]),
            Message::assistant("a cat"),
        ];

        backup.save(&messages).expect("save");
        assert_eq!(backup.load().expect("load"), Some(messages));
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        let backup = JsonFileBackup::new(dir.path().join("absent.json"));
        assert_eq!(backup.load().expect("load"), None);
    }

    #[test]
    fn corrupt_file_is_a_backup_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("history.json");
        fs::write(&path, "{not json").expect("write");
        assert!(matches!(
            JsonFileBackup::new(path).load(),
            Err(LLMError::Backup { .. })
        ));
    }
}
