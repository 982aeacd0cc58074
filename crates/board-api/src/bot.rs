//! Token-gated JSON entry point for bots.
//!
//! Checks run in a fixed order: shared secret, body shape, content. Nothing
//! is written until all three pass.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{error, info, warn};

use board_types::api::{ApiResponse, BotPostRequest};

use crate::AppState;
use crate::auth;
use crate::board::{self, validate_content};
use crate::error::{AuthError, PostError};

/// Author used when the request names none.
pub const DEFAULT_BOT_USERNAME: &str = "Bot";

/// POST /api/post_message
pub async fn post_message(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if presented != Some(state.settings.api_token.as_str()) {
        warn!("Bot post rejected: bad or missing Authorization header");
        return reply(StatusCode::FORBIDDEN, ApiResponse::error("Unauthorized"));
    }

    let req = match parse_body(&body) {
        Ok(req) => req,
        Err(reason) => return reply(StatusCode::BAD_REQUEST, ApiResponse::error(reason)),
    };

    let content = req.content.unwrap_or_default();
    if let Err(e) = validate_content(&content) {
        return reply(StatusCode::BAD_REQUEST, ApiResponse::error(e.to_string()));
    }

    let username = req
        .username
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BOT_USERNAME.to_string());

    let db = state.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let author = auth::find_or_create(&db.db, &username, &db.settings.bot_password)
            .map_err(|e| match e {
                AuthError::Internal(e) => PostError::Internal(e),
                other => PostError::Internal(anyhow::anyhow!("cannot resolve bot user: {}", other)),
            })?;
        board::post(&db.db, &author, &content).map(|message| (author, message))
    })
    .await;

    match outcome {
        Ok(Ok((author, message))) => {
            info!("Bot message {} posted as {}", message.id, author.username);
            reply(StatusCode::CREATED, ApiResponse::success("Message posted successfully"))
        }
        Ok(Err(PostError::Validation(e))) => {
            reply(StatusCode::BAD_REQUEST, ApiResponse::error(e.to_string()))
        }
        Ok(Err(PostError::Internal(e))) => {
            error!("Bot post failed: {}", e);
            reply(StatusCode::INTERNAL_SERVER_ERROR, ApiResponse::error("Internal server error"))
        }
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            reply(StatusCode::INTERNAL_SERVER_ERROR, ApiResponse::error("Internal server error"))
        }
    }
}

fn parse_body(body: &[u8]) -> Result<BotPostRequest, &'static str> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err("Request body must be JSON");
    }
    serde_json::from_slice(body).map_err(|e| {
        warn!("Bot post rejected: malformed JSON: {}", e);
        "Invalid JSON body"
    })
}

fn reply(status: StatusCode, body: ApiResponse) -> Response {
    (status, Json(body)).into_response()
}
