use std::env;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::backend::BackendFlavor;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_EMBEDDINGS_MODEL: &str = "Omartificial-Intelligence-Space/Arabic-mpnet-base-all-nli-triplet";
const DEFAULT_EMBEDDINGS_MODELS: [&str; 4] = [
    "openai",
    "asafaya/bert-base-arabic",
    "Omartificial-Intelligence-Space/Arabic-mpnet-base-all-nli-triplet",
    "Omartificial-Intelligence-Space/Arabert-all-nli-triplet-Matryoshka",
];
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LLM_MODELS: [&str; 2] = ["gpt-4o-mini", "gpt-4o"];
const DEFAULT_UPLOAD_TYPES: [&str; 3] = ["pdf", "docx", "txt"];
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// The embedding and language models a user may pick from.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelCatalog {
    pub embeddings_models: Vec<String>,
    pub default_embeddings_model: String,
    pub llm_models: Vec<String>,
    pub default_llm_model: String,
    /// Accept any non-empty identifier instead of only the listed ones.
    pub allow_custom: bool,
}

impl ModelCatalog {
    pub fn accepts_embeddings_model(&self, model: &str) -> bool {
        Self::accepts(&self.embeddings_models, self.allow_custom, model)
    }

    pub fn accepts_llm_model(&self, model: &str) -> bool {
        Self::accepts(&self.llm_models, self.allow_custom, model)
    }

    fn accepts(allowed: &[String], allow_custom: bool, model: &str) -> bool {
        let model = model.trim();
        if model.is_empty() {
            return false;
        }
        allow_custom || allowed.iter().any(|m| m == model)
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            embeddings_models: DEFAULT_EMBEDDINGS_MODELS.iter().map(|m| m.to_string()).collect(),
            default_embeddings_model: DEFAULT_EMBEDDINGS_MODEL.to_string(),
            llm_models: DEFAULT_LLM_MODELS.iter().map(|m| m.to_string()).collect(),
            default_llm_model: DEFAULT_LLM_MODEL.to_string(),
            allow_custom: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base_url: String,
    pub flavor: BackendFlavor,
    pub models: ModelCatalog,
    pub chatbot_id: Option<String>,
    pub user_id: Option<String>,
    pub upload_types: Vec<String>,
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            flavor: BackendFlavor::Collection,
            models: ModelCatalog::default(),
            chatbot_id: None,
            user_id: None,
            upload_types: DEFAULT_UPLOAD_TYPES.iter().map(|t| t.to_string()).collect(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key/value source. Unset and blank
    /// values fall back to the defaults, malformed ones are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let api_base_url = var("MARAHEL_API_BASE_URL").unwrap_or(defaults.api_base_url);

        let flavor = match var("MARAHEL_BACKEND_FLAVOR") {
            Some(v) => v
                .parse::<BackendFlavor>()
                .context("Invalid MARAHEL_BACKEND_FLAVOR")?,
            None => defaults.flavor,
        };

        let allow_custom = match var("MARAHEL_ALLOW_CUSTOM_MODELS") {
            Some(v) => parse_bool(&v).context("Invalid MARAHEL_ALLOW_CUSTOM_MODELS")?,
            None => defaults.models.allow_custom,
        };

        let embeddings_models = var("MARAHEL_EMBEDDINGS_MODELS")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.models.embeddings_models);
        let default_embeddings_model = pick_default(
            var("MARAHEL_DEFAULT_EMBEDDINGS_MODEL"),
            defaults.models.default_embeddings_model,
            &embeddings_models,
            allow_custom,
            "MARAHEL_DEFAULT_EMBEDDINGS_MODEL",
        )?;

        let llm_models = var("MARAHEL_LLM_MODELS")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.models.llm_models);
        let default_llm_model = pick_default(
            var("MARAHEL_DEFAULT_LLM_MODEL"),
            defaults.models.default_llm_model,
            &llm_models,
            allow_custom,
            "MARAHEL_DEFAULT_LLM_MODEL",
        )?;

        let upload_types = var("MARAHEL_UPLOAD_TYPES")
            .map(|v| {
                split_list(&v)
                    .into_iter()
                    .map(|t| t.trim_start_matches('.').to_lowercase())
                    .collect::<Vec<String>>()
            })
            .unwrap_or(defaults.upload_types);

        let request_timeout = match var("MARAHEL_REQUEST_TIMEOUT_SECS") {
            Some(v) => {
                let secs = v.parse::<u64>().with_context(|| {
                    format!("MARAHEL_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got {v}")
                })?;
                if secs == 0 {
                    bail!("MARAHEL_REQUEST_TIMEOUT_SECS must be greater than zero");
                }
                Duration::from_secs(secs)
            }
            None => defaults.request_timeout,
        };

        Ok(Self {
            api_base_url,
            flavor,
            models: ModelCatalog {
                embeddings_models,
                default_embeddings_model,
                llm_models,
                default_llm_model,
                allow_custom,
            },
            chatbot_id: var("MARAHEL_CHATBOT_ID"),
            user_id: var("MARAHEL_USER_ID"),
            upload_types,
            request_timeout,
        })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("Expected a boolean, got {other}"),
    }
}

// An explicit default must be in the list. The built-in default is
// replaced by the first listed model when the list was overridden
// without it.
fn pick_default(
    explicit: Option<String>,
    builtin: String,
    allowed: &[String],
    allow_custom: bool,
    key: &str,
) -> Result<String> {
    if let Some(model) = explicit {
        if !allow_custom && !allowed.contains(&model) {
            bail!("{key} '{model}' is not one of the allowed models: {}", allowed.join(", "));
        }
        return Ok(model);
    }
    if allow_custom || allowed.contains(&builtin) {
        return Ok(builtin);
    }
    match allowed.first() {
        Some(first) => Ok(first.clone()),
        None => bail!("No models configured for {key}"),
    }
}
