use crate::core::{AppConfig, ModelCatalog};

pub fn run(config: &AppConfig) {
    println!("{}", render(&config.models));
}

pub fn render(models: &ModelCatalog) -> String {
    let mut out = String::from("Embeddings models:\n");
    for model in &models.embeddings_models {
        out.push_str(&line(model, &models.default_embeddings_model));
    }
    out.push_str("Language models:\n");
    for model in &models.llm_models {
        out.push_str(&line(model, &models.default_llm_model));
    }
    if models.allow_custom {
        out.push_str("Custom model identifiers are accepted.\n");
    }
    out.trim_end().to_string()
}

fn line(model: &str, default: &str) -> String {
    if model == default {
        format!("  * {} (default)\n", model)
    } else {
        format!("    {}\n", model)
    }
}
