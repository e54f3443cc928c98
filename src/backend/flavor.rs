//! The backends this client talks to share one contract but disagree
//! on field names and where parameters go. Each flavor maps the
//! abstract session keys onto its concrete wire shape.
use std::fmt;
use std::str::FromStr;

use anyhow::{Error, anyhow};
use serde_json::{Map, Value};

use super::{BackendError, IngestRequest};
use crate::session::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendFlavor {
    /// Keyed by `collection_name` + `Embeddings_model`
    Collection,
    /// Keyed by `chatbot_id` + `user_id`
    Chatbot,
    /// Keyed by a bare `uuid` + `llm_model`
    Uuid,
}

impl BackendFlavor {
    pub fn mapping(self) -> FieldMapping {
        match self {
            BackendFlavor::Collection => FieldMapping {
                session_key: "collection_name",
                secondary_key: Some("Embeddings_model"),
                user_id: None,
                ingest_model_field: "Embeddings_model",
                ingest_model_placement: Placement::Query,
                ingest_hint_field: None,
                ingest_response: IngestResponse::Data {
                    model_field: "Embeddings_model",
                },
                delete_placement: Placement::Query,
            },
            BackendFlavor::Chatbot => FieldMapping {
                session_key: "chatbot_id",
                secondary_key: None,
                user_id: Some("user_id"),
                ingest_model_field: "Embeddings_model",
                ingest_model_placement: Placement::Body,
                ingest_hint_field: Some("chatbot_id"),
                ingest_response: IngestResponse::Data {
                    model_field: "Embeddings_model",
                },
                delete_placement: Placement::Body,
            },
            BackendFlavor::Uuid => FieldMapping {
                session_key: "uuid",
                secondary_key: Some("llm_model"),
                user_id: None,
                ingest_model_field: "Embeddings_model",
                ingest_model_placement: Placement::Body,
                ingest_hint_field: None,
                ingest_response: IngestResponse::BareKey,
                delete_placement: Placement::Body,
            },
        }
    }
}

impl fmt::Display for BackendFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendFlavor::Collection => write!(f, "collection"),
            BackendFlavor::Chatbot => write!(f, "chatbot"),
            BackendFlavor::Uuid => write!(f, "uuid"),
        }
    }
}

impl FromStr for BackendFlavor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "collection" => Ok(BackendFlavor::Collection),
            "chatbot" => Ok(BackendFlavor::Chatbot),
            "uuid" => Ok(BackendFlavor::Uuid),
            other => Err(anyhow!(
                "Unknown backend flavor '{}', expected one of: collection, chatbot, uuid",
                other
            )),
        }
    }
}

/// Where a parameter travels. For ingest `Body` means a multipart form
/// field, for delete it means a JSON body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Query,
    Body,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestResponse {
    /// `{ "data": { <session_key>, <model_field> } }`
    Data { model_field: &'static str },
    /// `{ <session_key> }` at the top level
    BareKey,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldMapping {
    pub session_key: &'static str,
    /// Sent alongside the session key when conversing
    pub secondary_key: Option<&'static str>,
    /// Set when the backend requires a user id to converse
    pub user_id: Option<&'static str>,
    pub ingest_model_field: &'static str,
    pub ingest_model_placement: Placement,
    pub ingest_hint_field: Option<&'static str>,
    pub ingest_response: IngestResponse,
    pub delete_placement: Placement,
}

impl FieldMapping {
    pub fn requires_user_id(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn converse_body(&self, question: &str, session: &Session) -> Value {
        let mut body = Map::new();
        body.insert("query".to_string(), Value::from(question));
        body.insert(self.session_key.to_string(), Value::from(session.session_key.as_str()));
        if let (Some(field), Some(value)) = (self.secondary_key, &session.secondary_key) {
            body.insert(field.to_string(), Value::from(value.as_str()));
        }
        if let (Some(field), Some(value)) = (self.user_id, &session.user_id) {
            body.insert(field.to_string(), Value::from(value.as_str()));
        }
        Value::Object(body)
    }

    pub fn delete_body(&self, session_key: &str) -> Value {
        let mut body = Map::new();
        body.insert(self.session_key.to_string(), Value::from(session_key));
        Value::Object(body)
    }

    /// Turn a successful ingest response into a `Session`. The user id
    /// is left for the caller to fill in. Only flavors that send a hint
    /// may fall back to it when the key is not echoed.
    pub fn parse_ingest(&self, body: &Value, request: &IngestRequest<'_>) -> Result<Session, BackendError> {
        let (container, model_field) = match self.ingest_response {
            IngestResponse::Data { model_field } => {
                let data = body
                    .get("data")
                    .filter(|d| d.is_object())
                    .ok_or_else(|| BackendError::malformed(format!("missing `data` object in {}", body)))?;
                (data, Some(model_field))
            }
            IngestResponse::BareKey => (body, None),
        };

        let session_key = key_as_string(container.get(self.session_key))
            .or_else(|| self.ingest_hint_field.and(request.session_hint).map(String::from))
            .ok_or_else(|| {
                BackendError::malformed(format!("missing `{}` in {}", self.session_key, body))
            })?;

        let mut session = Session::new(&session_key);
        session.secondary_key = match model_field {
            Some(field) => Some(
                key_as_string(container.get(field))
                    .unwrap_or_else(|| request.embeddings_model.to_string()),
            ),
            None => request.llm_model.map(String::from),
        };

        Ok(session)
    }
}

// Identifiers are opaque; accept numbers as well as strings.
fn key_as_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
