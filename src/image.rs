//! Image sources for vision requests.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::LLMError;
use crate::types::{ContentBlock, ImageDetail};

/// MIME type stamped on every local image, whatever its actual format.
const LOCAL_IMAGE_MIME: &str = "image/jpeg";

/// Where an image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// File on the local disk; inlined as a base64 data URI.
    Local(PathBuf),
    /// Remote URL or an existing data URI; passed through unchanged.
    Remote(String),
}

impl ImageInput {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        ImageInput::Local(path.into())
    }

    pub fn remote(url: impl Into<String>) -> Self {
        ImageInput::Remote(url.into())
    }

    /// Resolves the input to the URL carried by an image block.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::ImageEncoding`] when a local file cannot be read.
    pub fn resolve_url(&self) -> Result<String, LLMError> {
        match self {
            ImageInput::Local(path) => encode_local_image(path),
            ImageInput::Remote(url) => Ok(url.clone()),
        }
    }

    /// Resolves the input into a high-detail image block.
    pub fn to_block(&self) -> Result<ContentBlock, LLMError> {
        Ok(ContentBlock::image(self.resolve_url()?, ImageDetail::High))
    }
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        ImageInput::Local(path)
    }
}

impl From<&Path> for ImageInput {
    fn from(path: &Path) -> Self {
        ImageInput::Local(path.to_path_buf())
    }
}

/// Reads `path` and returns `data:image/jpeg;base64,<payload>`.
pub fn encode_local_image(path: &Path) -> Result<String, LLMError> {
    let bytes = fs::read(path).map_err(|err| LLMError::ImageEncoding {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    Ok(format!("data:{LOCAL_IMAGE_MIME};base64,{}", STANDARD.encode(bytes)))
}
