use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod ask;
pub mod chat;
pub mod delete;
pub mod ingest;
pub mod models;

use crate::backend::{BackendError, BackendFlavor, HttpBackend};
use crate::core::{AppConfig, logging};
use crate::session::{Session, SessionController, SessionControllerBuilder};

#[derive(Subcommand)]
enum Command {
    /// Chat with your documents interactively
    Chat {
        /// Resume an existing collection instead of uploading documents
        #[arg(long)]
        collection: Option<String>,
        /// Model the existing collection is bound to
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Upload documents and print the new session
    Ingest {
        /// Embeddings model, defaults to MARAHEL_DEFAULT_EMBEDDINGS_MODEL
        #[arg(long)]
        model: Option<String>,
        /// Ingest into this chatbot, defaults to MARAHEL_CHATBOT_ID
        #[arg(long)]
        chatbot_id: Option<String>,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Ask a single question against an existing collection
    Ask {
        #[arg(long)]
        collection: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
    /// Delete a collection on the backend
    Delete {
        #[arg(long)]
        collection: String,
    },
    /// List the configured embedding and language models
    Models {},
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Backend base URL, overrides MARAHEL_API_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Backend flavor, overrides MARAHEL_BACKEND_FLAVOR
    #[arg(long, global = true, value_enum)]
    flavor: Option<BackendFlavor>,

    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<ExitCode> {
    let args = Cli::parse();
    logging::init();

    let mut config = AppConfig::from_env()?;
    if let Some(base_url) = args.base_url {
        config.api_base_url = base_url;
    }
    if let Some(flavor) = args.flavor {
        config.flavor = flavor;
    }
    tracing::debug!("Using {} backend at {}", config.flavor, config.api_base_url);

    // Handle each sub command
    let code = match args.command {
        Some(Command::Chat {
            collection,
            model,
            user_id,
        }) => {
            chat::run(&config, collection, model, user_id).await?;
            ExitCode::SUCCESS
        }
        Some(Command::Ingest {
            model,
            chatbot_id,
            files,
        }) => ingest::run(&config, model, chatbot_id, files).await?,
        Some(Command::Ask {
            collection,
            model,
            user_id,
            question,
        }) => ask::run(&config, collection, model, user_id, question.join(" ")).await?,
        Some(Command::Delete { collection }) => delete::run(&config, collection).await?,
        Some(Command::Models {}) => {
            models::run(&config);
            ExitCode::SUCCESS
        }
        None => {
            chat::run(&config, None, None, None).await?;
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}

/// A controller wired to the configured HTTP backend.
pub fn controller(config: &AppConfig, user_id: Option<&str>) -> SessionController<HttpBackend> {
    SessionControllerBuilder::new(HttpBackend::from_config(config))
        .models(config.models.clone())
        .user_id(user_id.or(config.user_id.as_deref()))
        .llm_model(Some(config.models.default_llm_model.as_str()))
        .session_hint(config.chatbot_id.as_deref())
        .build()
}

/// A session for an identifier the user already holds. Without an
/// explicit model the flavor's default is used, an explicit one must be
/// in the catalog.
pub fn existing_session(
    config: &AppConfig,
    session_key: &str,
    model: Option<&str>,
) -> Result<Session, BackendError> {
    let session_key = session_key.trim();
    if session_key.is_empty() {
        return Err(BackendError::validation("A collection name is required"));
    }
    let catalog = &config.models;
    let secondary_key = match (model.map(str::trim), config.flavor) {
        (Some(model), BackendFlavor::Uuid) => {
            if !catalog.accepts_llm_model(model) {
                return Err(BackendError::validation(format!(
                    "Unknown language model '{}'. Choose one of: {}",
                    model,
                    catalog.llm_models.join(", ")
                )));
            }
            Some(model.to_string())
        }
        (Some(model), _) => {
            if !catalog.accepts_embeddings_model(model) {
                return Err(BackendError::validation(format!(
                    "Unknown embeddings model '{}'. Choose one of: {}",
                    model,
                    catalog.embeddings_models.join(", ")
                )));
            }
            Some(model.to_string())
        }
        (None, BackendFlavor::Collection) => Some(catalog.default_embeddings_model.clone()),
        (None, BackendFlavor::Uuid) => Some(catalog.default_llm_model.clone()),
        (None, BackendFlavor::Chatbot) => None,
    };
    Ok(Session {
        session_key: session_key.to_string(),
        secondary_key,
        user_id: None,
    })
}
