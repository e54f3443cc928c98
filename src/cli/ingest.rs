use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;

use crate::core::AppConfig;
use crate::session::UploadBatch;

pub async fn run(
    config: &AppConfig,
    model: Option<String>,
    chatbot_id: Option<String>,
    files: Vec<PathBuf>,
) -> Result<ExitCode> {
    let batch = UploadBatch::from_paths(&files, &config.upload_types).await?;
    let model = model.unwrap_or_else(|| config.models.default_embeddings_model.clone());

    let mut controller = super::controller(config, None);
    match controller.ingest(&batch, &model, chatbot_id.as_deref()).await {
        Ok(session) => {
            println!("Documents processed successfully!");
            println!("Current collection: {}", session);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
