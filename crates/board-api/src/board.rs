use axum::{
    Extension, Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use minijinja::context;
use tracing::{error, info, warn};
use uuid::Uuid;

use board_db::MessageRepository;
use board_db::models::MessageRow;
use board_types::api::PostForm;
use board_types::models::{Identity, Message, Viewer};

use crate::{AppState, blocking};
use crate::error::{PostError, ValidationError, internal};

/// Longest accepted message, in characters.
pub const MAX_CONTENT_LEN: usize = 200;

pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(ValidationError::ContentTooLong { max: MAX_CONTENT_LEN });
    }
    Ok(())
}

/// Every message in write order.
pub fn list_messages<R>(ledger: &R) -> anyhow::Result<Vec<Message>>
where
    R: MessageRepository + ?Sized,
{
    ledger
        .all_messages()?
        .into_iter()
        .map(message_from_row)
        .collect()
}

/// Append a message by `author`. Visible to `list_messages` once this returns.
pub fn post<R>(ledger: &R, author: &Identity, content: &str) -> Result<Message, PostError>
where
    R: MessageRepository + ?Sized,
{
    validate_content(content)?;

    let id = Uuid::new_v4().to_string();
    ledger.append_message(&id, &author.id.to_string(), content)?;

    let row = ledger
        .message(&id)?
        .ok_or_else(|| anyhow::anyhow!("message {} missing after insert", id))?;

    info!("{} posted message {}", author.username, id);
    Ok(message_from_row(row)?)
}

fn message_from_row(row: MessageRow) -> anyhow::Result<Message> {
    // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
    let created_at = chrono::NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on message '{}': {}", row.created_at, row.id, e);
            chrono::DateTime::default()
        });

    Ok(Message {
        id: row.id.parse()?,
        author_id: row.author_id.parse()?,
        author_username: row.author_username,
        content: row.content,
        created_at,
    })
}

// -- Handlers --

pub async fn index(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Response, StatusCode> {
    board_page(&state, &viewer, StatusCode::OK, None, "").await
}

pub async fn post_message(
    State(state): State<AppState>,
    Extension(author): Extension<Identity>,
    Form(form): Form<PostForm>,
) -> Result<Response, StatusCode> {
    let db = state.clone();
    let who = author.clone();
    let content = form.content.clone();
    let result = blocking(move || post(&db.db, &who, &content)).await?;

    match result {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(PostError::Validation(e)) => {
            warn!("Rejected post from {}: {}", author.username, e);
            let viewer = Viewer::Authenticated(author);
            board_page(&state, &viewer, StatusCode::BAD_REQUEST, Some(e.to_string()), &form.content).await
        }
        Err(PostError::Internal(e)) => {
            error!("Failed to store message: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn board_page(
    state: &AppState,
    viewer: &Viewer,
    status: StatusCode,
    error: Option<String>,
    draft: &str,
) -> Result<Response, StatusCode> {
    let db = state.clone();
    let messages = blocking(move || list_messages(&db.db))
        .await?
        .map_err(internal("failed to list messages"))?;
    let html = state.templates.page(
        "index.html",
        context! {
            messages,
            error,
            draft,
            username => viewer.username(),
            max_len => MAX_CONTENT_LEN,
        },
    )?;
    Ok((status, html).into_response())
}
