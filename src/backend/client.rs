use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::Value;

use super::{Backend, BackendError, BackendFlavor, FieldMapping, IngestRequest, Placement};
use crate::core::AppConfig;
use crate::session::Session;

const INGEST_PATH: &str = "/api/Ingestion_File";
const CHAT_PATH: &str = "/api/chat-bot";
const DELETE_PATH: &str = "/api/delete-collection";

/// `Backend` over HTTP. Every request carries an explicit timeout.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    mapping: FieldMapping,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: &str, flavor: BackendFlavor, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            mapping: flavor.mapping(),
            timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.api_base_url, config.flavor, config.request_timeout)
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn ingest_form(&self, request: &IngestRequest<'_>) -> Result<Form, BackendError> {
        let mut form = Form::new();
        for file in request.batch.files() {
            let part = Part::bytes(file.content.clone())
                .file_name(file.filename.clone())
                .mime_str(&file.media_type)
                .map_err(|e| {
                    BackendError::validation(format!(
                        "Invalid media type '{}' for {}: {}",
                        file.media_type, file.filename, e
                    ))
                })?;
            form = form.part("files", part);
        }

        if self.mapping.ingest_model_placement == Placement::Body {
            form = form.text(
                self.mapping.ingest_model_field,
                request.embeddings_model.to_string(),
            );
            if let (Some(field), Some(hint)) = (self.mapping.ingest_hint_field, request.session_hint) {
                form = form.text(field, hint.to_string());
            }
        }

        Ok(form)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn ingest(&self, request: IngestRequest<'_>) -> Result<Session, BackendError> {
        let form = self.ingest_form(&request)?;

        let mut req = self.client.post(self.url(INGEST_PATH)).timeout(self.timeout);
        if self.mapping.ingest_model_placement == Placement::Query {
            req = req.query(&[(self.mapping.ingest_model_field, request.embeddings_model)]);
            if let (Some(field), Some(hint)) = (self.mapping.ingest_hint_field, request.session_hint) {
                req = req.query(&[(field, hint)]);
            }
        }

        tracing::debug!(
            "POST {} with {} file(s), model {}",
            INGEST_PATH,
            request.batch.len(),
            request.embeddings_model
        );
        let response = req.multipart(form).send().await?;
        let body = read_json(response).await?;

        self.mapping.parse_ingest(&body, &request)
    }

    async fn converse(&self, question: &str, session: &Session) -> Result<String, BackendError> {
        let payload = self.mapping.converse_body(question, session);

        tracing::debug!("POST {} for session {}", CHAT_PATH, session.session_key);
        let response = self
            .client
            .post(self.url(CHAT_PATH))
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?;
        let body = read_json(response).await?;

        match body.get("data") {
            Some(Value::String(answer)) => Ok(answer.clone()),
            Some(Value::Null) | None => Err(BackendError::malformed(format!(
                "missing `data` in {}",
                body
            ))),
            Some(other) => Ok(other.to_string()),
        }
    }

    async fn delete_collection(&self, session_key: &str) -> Result<(), BackendError> {
        let mut req = self.client.delete(self.url(DELETE_PATH)).timeout(self.timeout);
        req = match self.mapping.delete_placement {
            Placement::Query => req.query(&[(self.mapping.session_key, session_key)]),
            Placement::Body => req.json(&self.mapping.delete_body(session_key)),
        };

        tracing::debug!("DELETE {} for {}", DELETE_PATH, session_key);
        let response = req.send().await?;
        check_status(response).await?;
        Ok(())
    }

    fn requires_user_id(&self) -> bool {
        self.mapping.requires_user_id()
    }
}

/// Returns the body text of a 2xx response, otherwise an
/// `Application` error carrying the backend's `message`.
async fn check_status(response: Response) -> Result<String, BackendError> {
    let status = response.status();
    let text = response.text().await?;
    if status.is_success() {
        return Ok(text);
    }

    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("request failed with HTTP status {}", status.as_u16()));

    Err(BackendError::application(status.as_u16(), message))
}

async fn read_json(response: Response) -> Result<Value, BackendError> {
    let text = check_status(response).await?;
    serde_json::from_str(&text).map_err(BackendError::malformed)
}
