//! Test utilities for integration tests
#![allow(dead_code)]
use std::fs;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpListener;

use marahel::backend::{BackendFlavor, HttpBackend};
use marahel::core::ModelCatalog;
use marahel::session::{SessionController, SessionControllerBuilder, UploadBatch};

/// Creates a controller talking to `url` with the default model
/// catalog and a short timeout.
pub fn test_controller(
    url: &str,
    flavor: BackendFlavor,
    user_id: Option<&str>,
) -> SessionController<HttpBackend> {
    SessionControllerBuilder::new(HttpBackend::new(url, flavor, Duration::from_millis(500)))
        .models(ModelCatalog::default())
        .user_id(user_id)
        .llm_model(Some("gpt-4o-mini"))
        .build()
}

/// Writes a text and a PDF document to a temporary directory and
/// loads them as an upload batch. Keep the `TempDir` alive for as
/// long as the files are needed.
pub async fn test_batch() -> (TempDir, UploadBatch) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let txt = dir.path().join("policy.txt");
    let pdf = dir.path().join("handbook.pdf");
    fs::write(&txt, "Employees accrue two vacation days per month.").expect("Failed to write txt");
    fs::write(&pdf, "%PDF-1.4 handbook").expect("Failed to write pdf");

    let accepted: Vec<String> = ["pdf", "docx", "txt"].iter().map(|s| s.to_string()).collect();
    let batch = UploadBatch::from_paths(&[txt, pdf], &accepted)
        .await
        .expect("Failed to load upload batch");
    (dir, batch)
}

/// Starts a server that accepts connections and never answers.
/// Returns its base URL.
pub async fn unresponsive_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}
