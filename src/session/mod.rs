pub mod controller;
pub mod models;

pub use controller::{SessionController, SessionControllerBuilder, SessionState};
pub use models::{Role, Session, Transcript, Turn, UploadBatch, UploadFile};
