//! The state a user holds while talking to a document collection: the
//! backend-assigned session identifiers, the visible transcript and
//! the files being uploaded.
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in the conversation. Never mutated once recorded.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
        }
    }
}

/// Append-only, chronological list of turns. Only the whole
/// transcript can be cleared.
#[derive(Clone, Debug, Default)]
pub struct Transcript(Vec<Turn>);

impl Transcript {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn turns(&self) -> &[Turn] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.0.push(turn)
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear()
    }
}

/// Identifiers binding a user's uploaded documents to later questions.
///
/// What `session_key` and `secondary_key` mean on the wire depends on
/// the backend flavor, e.g. a collection name and the embeddings model
/// it was built with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub session_key: String,
    pub secondary_key: Option<String>,
    pub user_id: Option<String>,
}

impl Session {
    pub fn new(session_key: &str) -> Self {
        Self {
            session_key: session_key.to_string(),
            secondary_key: None,
            user_id: None,
        }
    }

    pub fn with_secondary_key(mut self, secondary_key: &str) -> Self {
        self.secondary_key = Some(secondary_key.to_string());
        self
    }

    pub fn with_user_id(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.session_key)?;
        if let Some(secondary) = &self.secondary_key {
            write!(f, " (model: {})", secondary)?;
        }
        if let Some(user_id) = &self.user_id {
            write!(f, " (user: {})", user_id)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UploadFile {
    pub filename: String,
    pub content: Vec<u8>,
    pub media_type: String,
}

impl UploadFile {
    pub fn new(filename: &str, content: Vec<u8>, media_type: &str) -> Self {
        Self {
            filename: filename.to_string(),
            content,
            media_type: media_type.to_string(),
        }
    }

    /// Read a file from disk, inferring its media type from the
    /// extension. An empty `accepted` list accepts every extension.
    pub async fn from_path(path: &Path, accepted: &[String]) -> Result<Self> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Not a file path: {}", path.display()))?
            .to_string();

        if !accepted.is_empty() {
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .unwrap_or_default();
            if !accepted.contains(&extension) {
                bail!(
                    "Unsupported file type for {}. Accepted types: {}",
                    filename,
                    accepted.join(", ")
                );
            }
        }

        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let media_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        Ok(Self {
            filename,
            content,
            media_type,
        })
    }
}

/// Files sent together in a single ingest call. Transient: it only
/// lives for the duration of the upload.
#[derive(Clone, Debug, Default)]
pub struct UploadBatch {
    files: Vec<UploadFile>,
}

impl UploadBatch {
    pub fn new(files: Vec<UploadFile>) -> Self {
        Self { files }
    }

    pub async fn from_paths<P: AsRef<Path>>(paths: &[P], accepted: &[String]) -> Result<Self> {
        if paths.is_empty() {
            bail!("Select at least one document to upload");
        }
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(UploadFile::from_path(path.as_ref(), accepted).await?);
        }
        Ok(Self { files })
    }

    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
