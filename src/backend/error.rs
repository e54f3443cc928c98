use thiserror::Error;

/// Why a call to the backend did not produce a result.
///
/// None of these are fatal to the process: the caller renders them and
/// moves on. There are no retries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The backend answered with a non-2xx status.
    #[error("Error: {message}")]
    Application { status: u16, message: String },

    /// The request never got a usable answer: connection, DNS or
    /// timeout failures, or a success response that isn't the expected
    /// JSON.
    #[error("Error connecting to the API: {0}")]
    Transport(String),

    /// Rejected locally before any request was sent.
    #[error("Error: {0}")]
    Validation(String),
}

impl BackendError {
    pub fn application(status: u16, message: impl Into<String>) -> Self {
        Self::Application {
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn malformed(detail: impl std::fmt::Display) -> Self {
        Self::Transport(format!("malformed response from backend: {detail}"))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("request timed out: {err}"))
        } else if err.is_decode() {
            Self::malformed(err)
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_renders_messages_for_display() {
        let err = BackendError::application(500, "disk full");
        assert_eq!(err.to_string(), "Error: disk full");
        assert!(err.is_application());

        let err = BackendError::transport("connection refused");
        assert_eq!(err.to_string(), "Error connecting to the API: connection refused");
        assert!(err.is_transport());

        let err = BackendError::malformed("expected JSON");
        assert!(err.is_transport());
        assert!(err.to_string().contains("malformed response"));

        assert!(BackendError::validation("no session").is_validation());
    }
}
