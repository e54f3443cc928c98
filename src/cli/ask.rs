use std::process::ExitCode;

use anyhow::Result;

use crate::core::AppConfig;

pub async fn run(
    config: &AppConfig,
    collection: String,
    model: Option<String>,
    user_id: Option<String>,
    question: String,
) -> Result<ExitCode> {
    let mut controller = super::controller(config, user_id.as_deref());
    match super::existing_session(config, &collection, model.as_deref()) {
        Ok(session) => {
            controller.attach(session);
        }
        Err(e) => {
            eprintln!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    }

    match controller.converse(&question).await {
        Ok(turn) => {
            println!("{}", turn.content);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
