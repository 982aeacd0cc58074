//! Session gateway: cookie-carried login sessions.
//!
//! A session is a row in `sessions` plus a signed token in the
//! `board_session` cookie naming that row. Deleting the row ends the
//! session even if the client keeps the cookie.

use anyhow::Result;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use board_db::{SessionRepository, UserRepository};
use board_types::models::{Identity, Viewer};

use crate::auth::identity_from_row;
use crate::{AppState, Settings, blocking};

pub const SESSION_COOKIE: &str = "board_session";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    /// Session row id.
    pub sid: Uuid,
    pub exp: usize,
}

/// Record a new session for `identity` and return the cookie that carries it.
pub fn start_session<S>(store: &S, settings: &Settings, identity: &Identity) -> Result<Cookie<'static>>
where
    S: SessionRepository + ?Sized,
{
    let sid = Uuid::new_v4();
    let ttl = settings.session_ttl;

    store.open_session(&sid.to_string(), &identity.id.to_string(), ttl.num_seconds())?;

    let claims = Claims {
        sub: identity.id,
        username: identity.username.clone(),
        sid,
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.session_secret.as_bytes()),
    )?;

    info!("Session started for {}", identity.username);
    Ok(session_cookie(token))
}

/// Forget the session named by the cookie, if any, and clear the cookie.
/// Safe to call repeatedly.
pub fn end_session<S>(store: &S, settings: &Settings, jar: CookieJar) -> Result<CookieJar>
where
    S: SessionRepository + ?Sized,
{
    if let Some(claims) = jar
        .get(SESSION_COOKIE)
        .and_then(|c| decode_token(c.value(), &settings.session_secret))
    {
        if store.close_session(&claims.sid.to_string())? {
            info!("Session ended for {}", claims.username);
        }
    }

    Ok(jar.remove(Cookie::build(SESSION_COOKIE).path("/")))
}

/// Map a session token to the viewer it belongs to. Any defect in the
/// token, a closed or expired session, or a vanished user yields `Anonymous`.
pub fn resolve_viewer<S>(store: &S, settings: &Settings, token: &str) -> Result<Viewer>
where
    S: SessionRepository + UserRepository + ?Sized,
{
    let Some(claims) = decode_token(token, &settings.session_secret) else {
        return Ok(Viewer::Anonymous);
    };

    let Some(session) = store.live_session(&claims.sid.to_string())? else {
        debug!("Session {} is closed or expired", claims.sid);
        return Ok(Viewer::Anonymous);
    };
    if session.user_id != claims.sub.to_string() {
        return Ok(Viewer::Anonymous);
    }

    match store.user_by_id(&session.user_id)? {
        Some(row) => Ok(Viewer::Authenticated(identity_from_row(row)?)),
        None => Ok(Viewer::Anonymous),
    }
}

fn decode_token(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| debug!("Rejected session token: {}", e))
    .ok()
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Attach a `Viewer` to every request.
pub async fn resolve_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let viewer = match jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        Some(token) => {
            let db = state.clone();
            match blocking(move || resolve_viewer(&db.db, &db.settings, &token)).await {
                Ok(Ok(viewer)) => viewer,
                Ok(Err(e)) => {
                    error!("Session lookup failed: {}", e);
                    Viewer::Anonymous
                }
                Err(_) => Viewer::Anonymous,
            }
        }
        None => Viewer::Anonymous,
    };

    req.extensions_mut().insert(viewer);
    next.run(req).await
}

/// Gate for browser routes: anonymous viewers are sent to the login page,
/// authenticated ones get their `Identity` as a request extension.
pub async fn require_login(mut req: Request, next: Next) -> Response {
    let identity = req
        .extensions()
        .get::<Viewer>()
        .and_then(|viewer| viewer.identity())
        .cloned();

    match identity {
        Some(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        None => Redirect::to("/login").into_response(),
    }
}
