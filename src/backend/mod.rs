pub mod client;
pub mod error;
pub mod flavor;

use async_trait::async_trait;

pub use client::HttpBackend;
pub use error::BackendError;
pub use flavor::{BackendFlavor, FieldMapping, IngestResponse, Placement};

use crate::session::{Session, UploadBatch};

/// Everything the backend needs to build a collection from a batch of
/// files.
#[derive(Clone, Copy, Debug)]
pub struct IngestRequest<'a> {
    pub batch: &'a UploadBatch,
    pub embeddings_model: &'a str,
    /// A pre-chosen identifier (e.g. a chatbot id) to ingest into
    pub session_hint: Option<&'a str>,
    /// Language model to converse with, for backends that take one
    pub llm_model: Option<&'a str>,
}

/// The remote retrieval-augmented-generation service. Retrieval,
/// embedding and generation all happen on the other side of this
/// trait.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Upload documents and return the session that addresses them.
    async fn ingest(&self, request: IngestRequest<'_>) -> Result<Session, BackendError>;

    /// Ask a question against a session and return the answer.
    async fn converse(&self, question: &str, session: &Session) -> Result<String, BackendError>;

    async fn delete_collection(&self, session_key: &str) -> Result<(), BackendError>;

    /// Whether conversing requires `Session::user_id`.
    fn requires_user_id(&self) -> bool {
        false
    }
}
