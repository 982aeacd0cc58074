use serde::{Deserialize, Serialize};

// -- Browser forms --

#[derive(Debug, Default, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportForm {
    #[serde(default)]
    pub work_items: String,
}

// -- Bot API --

/// Body of `POST /api/post_message`. Both fields are optional at the parse
/// level so that a missing `content` is reported as a validation failure
/// rather than a malformed body.
#[derive(Debug, Default, Deserialize)]
pub struct BotPostRequest {
    pub username: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Success,
    Error,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: ApiStatus,
    pub message: String,
}

impl ApiResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self { status: ApiStatus::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: ApiStatus::Error, message: message.into() }
    }
}

// -- Report webhook --

/// JSON payload forwarded to the report automation endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportRequest {
    pub user: String,
    pub raw_text: String,
}
