//! Error types for encoding, the generation service and the orchestrator.

use crate::state::RequestKind;

/// Message shown when a generation action runs without a selected image.
pub const NO_IMAGE_MESSAGE: &str = "Please select an image first.";

/// Fallback shown when a failure carries no message of its own.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

/// Reading or preparing an image file failed.
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file type: {0}")]
    UnsupportedMedia(String),
}

/// The remote generation service failed to produce text.
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("Request to generation service failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Request blocked by the generation service: {0}")]
    Blocked(String),

    #[error("Malformed response from generation service: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for ServiceError {
    // The request URL never reaches a message shown to the page or the logs.
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Transport(err.without_url())
    }
}

/// Everything that can end a generation request in the failed state.
#[derive(thiserror::Error, Debug)]
pub enum GenerationError {
    #[error("{}", NO_IMAGE_MESSAGE)]
    NoImageSelected,

    #[error("A {0} request is already in progress.")]
    AlreadyPending(RequestKind),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl GenerationError {
    /// Text displayed in the affected slot's error banner.
    pub fn display_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }
}

/// Invalid or missing configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set (environment or .env file)")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}
