use axum::http::StatusCode;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username already exists")]
    UsernameTaken,

    /// Shared by unknown usernames and wrong passwords.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username and password are required")]
    MissingFields,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message content cannot be empty")]
    EmptyContent,

    #[error("Message content must be at most {max} characters")]
    ContentTooLong { max: usize },
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Report service did not answer within {0} seconds")]
    Timeout(u64),

    #[error("Could not reach report service: {0}")]
    Transport(String),
}

/// Log an unexpected failure and collapse it to a 500.
pub fn internal<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> StatusCode + '_ {
    move |e| {
        error!("{}: {}", context, e);
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
