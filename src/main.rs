use std::process::ExitCode;

use anyhow::Result;
use marahel::cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    cli::run().await
}
