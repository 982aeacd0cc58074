pub mod auth;
pub mod board;
pub mod bot;
pub mod error;
pub mod flash;
pub mod report;
pub mod session;
pub mod templates;

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use board_db::Database;

use crate::report::ReportRelay;
use crate::templates::Templates;

pub type AppState = Arc<AppStateInner>;

/// Everything a request handler needs, built once at startup.
pub struct AppStateInner {
    pub db: Database,
    pub settings: Settings,
    pub templates: Templates,
    pub relay: ReportRelay,
}

impl AppStateInner {
    pub fn new(db: Database, settings: Settings, relay: ReportRelay) -> anyhow::Result<AppState> {
        Ok(Arc::new(Self {
            db,
            settings,
            templates: Templates::new()?,
            relay,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// HMAC key for session tokens.
    pub session_secret: String,
    /// How long a login stays valid.
    pub session_ttl: chrono::Duration,
    /// Shared secret expected verbatim in the bot API's `Authorization` header.
    pub api_token: String,
    /// Password assigned to users created through the bot API.
    pub bot_password: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session_secret: "dev-secret-change-me".into(),
            session_ttl: chrono::Duration::days(30),
            api_token: "my-secret-token".into(),
            bot_password: "bot-password".into(),
        }
    }
}

/// Full HTTP surface of the board.
pub fn router(state: AppState) -> Router {
    let public_routes: Router<AppState> = Router::new()
        .route("/", get(board::index))
        .route("/register", get(auth::register_form).post(auth::register_submit))
        .route("/login", get(auth::login_form).post(auth::login_submit))
        .route("/health", get(health));

    // Merged with the public GET on `/`; only the POST is gated.
    let protected_routes: Router<AppState> = Router::new()
        .route("/", post(board::post_message))
        .route("/logout", get(auth::logout))
        .route("/n8n-tools", get(report::tools_page))
        .route("/generate_report", post(report::generate_report))
        .route_layer(middleware::from_fn(session::require_login));

    let api_routes: Router<AppState> = Router::new().route("/api/post_message", post(bot::post_message));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(api_routes)
        .layer(middleware::from_fn_with_state(state.clone(), session::resolve_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run storage or hashing work on the blocking pool, never on an async worker.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, StatusCode>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(error::internal("spawn_blocking join error"))
}

async fn health() -> &'static str {
    "ok"
}
