use std::process::ExitCode;

use anyhow::Result;

use crate::core::AppConfig;

pub async fn run(config: &AppConfig, collection: String) -> Result<ExitCode> {
    let mut controller = super::controller(config, None);

    match controller.delete_collection(&collection).await {
        Ok(()) => {
            println!("Collection deleted successfully!");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
