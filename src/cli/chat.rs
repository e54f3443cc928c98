use std::path::PathBuf;

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::core::AppConfig;
use crate::session::{SessionState, UploadBatch};

const HELP: &str = "\
Commands:
  /upload [--model M] <paths..>  Upload documents and start a new session
  /delete [collection]           Delete a collection (the active one by default)
  /session                       Show the active session
  /history                       Show the conversation so far
  /models                        List the configured models
  /new                           Forget the active session
  /help                          Show this help
  /exit                          Quit
Anything else is sent as a question about your documents.";

#[derive(Debug, PartialEq)]
pub enum ReplCommand {
    Ask(String),
    Upload {
        model: Option<String>,
        paths: Vec<PathBuf>,
    },
    Delete(Option<String>),
    Session,
    History,
    Models,
    New,
    Help,
    Exit,
    Empty,
    Invalid(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Empty;
        }
        if !line.starts_with('/') {
            return ReplCommand::Ask(line.to_string());
        }

        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let rest: Vec<&str> = words.collect();

        match command {
            "/upload" => Self::parse_upload(&rest),
            "/delete" => ReplCommand::Delete(rest.first().map(|s| s.to_string())),
            "/session" => ReplCommand::Session,
            "/history" => ReplCommand::History,
            "/models" => ReplCommand::Models,
            "/new" => ReplCommand::New,
            "/help" => ReplCommand::Help,
            "/exit" | "/quit" => ReplCommand::Exit,
            other => ReplCommand::Invalid(format!("Unknown command {}. Type /help for help.", other)),
        }
    }

    fn parse_upload(args: &[&str]) -> Self {
        let mut model = None;
        let mut paths = Vec::new();
        let mut args = args.iter();
        while let Some(arg) = args.next() {
            if *arg == "--model" {
                match args.next() {
                    Some(m) => model = Some(m.to_string()),
                    None => return ReplCommand::Invalid("--model needs a value".to_string()),
                }
            } else {
                paths.push(PathBuf::from(arg));
            }
        }
        if paths.is_empty() {
            return ReplCommand::Invalid("Usage: /upload [--model M] <paths..>".to_string());
        }
        ReplCommand::Upload { model, paths }
    }
}

pub async fn run(
    config: &AppConfig,
    collection: Option<String>,
    model: Option<String>,
    user_id: Option<String>,
) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut controller = super::controller(config, user_id.as_deref());

    let resumed = match collection {
        Some(key) => match super::existing_session(config, &key, model.as_deref()) {
            Ok(session) => Some(session),
            Err(e) => {
                println!("{}", e);
                None
            }
        },
        None => None,
    };
    match resumed {
        Some(session) => println!("Current collection: {}", controller.attach(session)),
        None => println!("Please upload documents first using /upload. Type /help for help."),
    }

    loop {
        let readline = rl.readline(">>> ");
        let line = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };
        let _ = rl.add_history_entry(line.as_str());

        match ReplCommand::parse(&line) {
            ReplCommand::Ask(question) => {
                if controller.state() == SessionState::NoSession {
                    println!("Please upload documents first using /upload.");
                    continue;
                }
                match controller.converse(&question).await {
                    Ok(turn) => println!("{}", turn.content),
                    Err(e) => println!("{}", e),
                }
            }
            ReplCommand::Upload { model, paths } => {
                let batch = match UploadBatch::from_paths(&paths, &config.upload_types).await {
                    Ok(batch) => batch,
                    Err(e) => {
                        println!("Error: {:#}", e);
                        continue;
                    }
                };
                let model = model.unwrap_or_else(|| config.models.default_embeddings_model.clone());
                match controller.ingest(&batch, &model, None).await {
                    Ok(session) => {
                        println!("Documents processed successfully!");
                        println!("Current collection: {}", session);
                    }
                    Err(e) => println!("{}", e),
                }
            }
            ReplCommand::Delete(key) => {
                let result = match key {
                    Some(key) => controller.delete_collection(&key).await,
                    None => controller.delete_active_collection().await,
                };
                match result {
                    Ok(()) => println!("Collection deleted successfully!"),
                    Err(e) => println!("{}", e),
                }
            }
            ReplCommand::Session => match controller.session() {
                Some(session) => println!("Current collection: {}", session),
                None => println!("No active session."),
            },
            ReplCommand::History => {
                for turn in controller.transcript().iter() {
                    println!("{}: {}", turn.role, turn.content);
                }
            }
            ReplCommand::Models => println!("{}", super::models::render(&config.models)),
            ReplCommand::New => {
                controller.end_session();
                println!("Started a new session. Upload documents to continue.");
            }
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Exit => break,
            ReplCommand::Empty => {}
            ReplCommand::Invalid(msg) => println!("{}", msg),
        }
    }

    Ok(())
}
