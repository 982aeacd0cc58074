use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// An authenticated account as seen by request handlers.
///
/// Carries the stored password hash so the authenticator can verify against
/// it; it is never serialized.
#[derive(Clone)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Result of resolving the session attached to a request.
#[derive(Debug, Clone, Default)]
pub enum Viewer {
    Authenticated(Identity),
    #[default]
    Anonymous,
}

impl Viewer {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Anonymous => None,
        }
    }

    /// Posting, the tools page, report generation and logout all need this.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn username(&self) -> Option<&str> {
        self.identity().map(|i| i.username.as_str())
    }
}

/// A board post with its author resolved.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub author_username: String,
    pub created_at: DateTime<Utc>,
}
