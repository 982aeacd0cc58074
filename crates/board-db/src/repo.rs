//! Narrow storage interfaces used by the services in `board-api`.
//!
//! `Database` implements all three; tests and alternative stores only need
//! the slice they exercise.

use anyhow::Result;

use crate::Database;
use crate::models::{MessageRow, SessionRow, UserRow};

pub trait UserRepository: Send + Sync {
    fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<()>;
    fn user_by_username(&self, username: &str) -> Result<Option<UserRow>>;
    fn user_by_id(&self, id: &str) -> Result<Option<UserRow>>;
}

pub trait MessageRepository: Send + Sync {
    fn append_message(&self, id: &str, author_id: &str, content: &str) -> Result<()>;
    fn message(&self, id: &str) -> Result<Option<MessageRow>>;
    fn all_messages(&self) -> Result<Vec<MessageRow>>;
}

pub trait SessionRepository: Send + Sync {
    fn open_session(&self, id: &str, user_id: &str, ttl_secs: i64) -> Result<()>;
    fn live_session(&self, id: &str) -> Result<Option<SessionRow>>;
    fn close_session(&self, id: &str) -> Result<bool>;
}

impl UserRepository for Database {
    fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<()> {
        Database::create_user(self, id, username, password_hash)
    }

    fn user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.get_user_by_username(username)
    }

    fn user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.get_user_by_id(id)
    }
}

impl MessageRepository for Database {
    fn append_message(&self, id: &str, author_id: &str, content: &str) -> Result<()> {
        self.insert_message(id, author_id, content)
    }

    fn message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.get_message(id)
    }

    fn all_messages(&self) -> Result<Vec<MessageRow>> {
        self.list_messages()
    }
}

impl SessionRepository for Database {
    fn open_session(&self, id: &str, user_id: &str, ttl_secs: i64) -> Result<()> {
        self.create_session(id, user_id, ttl_secs)
    }

    fn live_session(&self, id: &str) -> Result<Option<SessionRow>> {
        self.get_session(id)
    }

    fn close_session(&self, id: &str) -> Result<bool> {
        self.delete_session(id)
    }
}
