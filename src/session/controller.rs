use super::models::{Session, Transcript, Turn, UploadBatch};
use crate::backend::{Backend, BackendError, IngestRequest};
use crate::core::ModelCatalog;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Active,
}

/// Holds one user's session and transcript and mediates every call to
/// the backend on their behalf.
///
/// The controller only moves between two states: `NoSession` and
/// `Active`. A successful ingest (or `attach`) activates a session,
/// a successful delete (or `end_session`) returns to `NoSession`.
/// Failed calls never change the state.
///
/// Use `SessionControllerBuilder` to construct a `SessionController`.
pub struct SessionController<B: Backend> {
    backend: B,
    models: ModelCatalog,
    user_id: Option<String>,
    llm_model: Option<String>,
    session_hint: Option<String>,
    session: Option<Session>,
    transcript: Transcript,
}

impl<B: Backend> SessionController<B> {
    pub fn state(&self) -> SessionState {
        if self.session.is_some() {
            SessionState::Active
        } else {
            SessionState::NoSession
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn models(&self) -> &ModelCatalog {
        &self.models
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }

    /// Upload a batch of documents and make the resulting collection
    /// the active session. On failure the previous session and
    /// transcript are left untouched.
    pub async fn ingest(
        &mut self,
        batch: &UploadBatch,
        embeddings_model: &str,
        session_hint: Option<&str>,
    ) -> Result<&Session, BackendError> {
        if batch.is_empty() {
            return Err(BackendError::validation("Select at least one document to upload"));
        }
        let embeddings_model = embeddings_model.trim();
        if !self.models.accepts_embeddings_model(embeddings_model) {
            return Err(BackendError::validation(format!(
                "Unknown embeddings model '{}'. Choose one of: {}",
                embeddings_model,
                self.models.embeddings_models.join(", ")
            )));
        }

        let request = IngestRequest {
            batch,
            embeddings_model,
            session_hint: session_hint.or(self.session_hint.as_deref()),
            llm_model: self.llm_model.as_deref(),
        };

        let mut session = match self.backend.ingest(request).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Ingest of {} file(s) failed: {}", batch.len(), e);
                return Err(e);
            }
        };
        session.user_id = self.user_id.clone();

        tracing::info!("Ingested {} file(s) into {}", batch.len(), session);
        self.transcript.clear();
        Ok(&*self.session.insert(session))
    }

    /// Use a session the user already has, e.g. a collection created
    /// earlier. Starts a fresh transcript.
    pub fn attach(&mut self, mut session: Session) -> &Session {
        if session.user_id.is_none() {
            session.user_id = self.user_id.clone();
        }
        tracing::info!("Attached to session {}", session);
        self.transcript.clear();
        &*self.session.insert(session)
    }

    /// Ask a question against the active session.
    ///
    /// Once the request is sent, exactly two turns are recorded: the
    /// question, then either the answer or the error text. Requests
    /// rejected locally (no session, missing user id, blank question)
    /// record nothing.
    pub async fn converse(&mut self, question: &str) -> Result<Turn, BackendError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| BackendError::validation("Please upload documents first"))?;
        if self.backend.requires_user_id() && session.user_id.as_deref().is_none_or(str::is_empty) {
            return Err(BackendError::validation("A user id is required to chat with this backend"));
        }
        let question = question.trim();
        if question.is_empty() {
            return Err(BackendError::validation("Ask a question about your documents"));
        }

        self.transcript.push(Turn::user(question));

        match self.backend.converse(question, session).await {
            Ok(answer) => {
                let turn = Turn::assistant(&answer);
                self.transcript.push(turn.clone());
                Ok(turn)
            }
            Err(e) => {
                tracing::warn!("Converse on {} failed: {}", session.session_key, e);
                self.transcript.push(Turn::assistant(&e.to_string()));
                Err(e)
            }
        }
    }

    /// Delete a collection on the backend. Success resets the
    /// controller to `NoSession` with an empty transcript, failure
    /// leaves everything as it was.
    pub async fn delete_collection(&mut self, session_key: &str) -> Result<(), BackendError> {
        let session_key = session_key.trim();
        if session_key.is_empty() {
            return Err(BackendError::validation("Enter the name of the collection to delete"));
        }

        if let Err(e) = self.backend.delete_collection(session_key).await {
            tracing::warn!("Delete of {} failed: {}", session_key, e);
            return Err(e);
        }

        tracing::info!("Deleted collection {}", session_key);
        self.end_session();
        Ok(())
    }

    pub async fn delete_active_collection(&mut self) -> Result<(), BackendError> {
        let session_key = self
            .session
            .as_ref()
            .map(|s| s.session_key.clone())
            .ok_or_else(|| BackendError::validation("There is no active collection to delete"))?;
        self.delete_collection(&session_key).await
    }

    /// Forget the session locally without telling the backend.
    pub fn end_session(&mut self) {
        self.session = None;
        self.transcript.clear();
    }
}

pub struct SessionControllerBuilder<B: Backend> {
    backend: B,
    models: ModelCatalog,
    user_id: Option<String>,
    llm_model: Option<String>,
    session_hint: Option<String>,
    session: Option<Session>,
}

impl<B: Backend> SessionControllerBuilder<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            models: ModelCatalog::default(),
            user_id: None,
            llm_model: None,
            session_hint: None,
            session: None,
        }
    }

    pub fn models(mut self, models: ModelCatalog) -> Self {
        self.models = models;
        self
    }

    pub fn user_id(mut self, user_id: Option<&str>) -> Self {
        self.user_id = user_id.map(String::from);
        self
    }

    pub fn llm_model(mut self, llm_model: Option<&str>) -> Self {
        self.llm_model = llm_model.map(String::from);
        self
    }

    /// Default hint passed on every ingest, e.g. a configured chatbot id
    pub fn session_hint(mut self, session_hint: Option<&str>) -> Self {
        self.session_hint = session_hint.map(String::from);
        self
    }

    /// Start out attached to an existing session
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn build(self) -> SessionController<B> {
        let mut controller = SessionController {
            backend: self.backend,
            models: self.models,
            user_id: self.user_id,
            llm_model: self.llm_model,
            session_hint: self.session_hint,
            session: None,
            transcript: Transcript::new(),
        };
        if let Some(session) = self.session {
            controller.attach(session);
        }
        controller
    }
}
