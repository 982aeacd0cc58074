#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
    routing::post,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use board_api::report::ReportRelay;
use board_api::{AppState, AppStateInner, Settings};
use board_db::Database;

pub const API_TOKEN: &str = "test-token";
pub const BOT_PASSWORD: &str = "bot-pass";

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        // nothing listens here; only report tests talk to the webhook
        Self::with_webhook("http://127.0.0.1:9/unused")
    }

    pub fn with_webhook(url: &str) -> Self {
        Self::with_webhook_timeout(url, Duration::from_secs(5))
    }

    pub fn with_webhook_timeout(url: &str, timeout: Duration) -> Self {
        let settings = Settings {
            session_secret: "test-session-secret".into(),
            api_token: API_TOKEN.into(),
            bot_password: BOT_PASSWORD.into(),
            ..Settings::default()
        };
        // ignore any proxy configured in the environment
        let client = reqwest::Client::builder().no_proxy().timeout(timeout).build().unwrap();
        let relay = ReportRelay::with_client(client, url, timeout);
        let state = AppStateInner::new(Database::open_in_memory().unwrap(), settings, relay).unwrap();
        let router = board_api::router(state.clone());
        Self { state, router }
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(form.to_string())).unwrap()).await
    }

    /// Register and return the `name=value` session cookie.
    pub async fn register(&self, username: &str, password: &str) -> String {
        let resp = self
            .post_form("/register", &format!("username={}&password={}", username, password), None)
            .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        cookie(&resp, "board_session").expect("registration sets a session cookie")
    }

    pub fn message_count(&self) -> u64 {
        self.state.db.count_messages().unwrap()
    }

    pub fn user_count(&self) -> u64 {
        self.state.db.count_users().unwrap()
    }
}

/// The `name=value` pair of a cookie set by `resp`, skipping removals.
pub fn cookie(resp: &Response<Body>, name: &str) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .find(|pair| {
            pair.split_once('=')
                .is_some_and(|(n, value)| n == name && !value.is_empty())
        })
        .map(str::to_string)
}

pub fn location(resp: &Response<Body>) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub async fn body_string(resp: Response<Body>) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
}

/// Throwaway report webhook answering every POST with `status` and `body`.
/// Returns its URL and the JSON payloads it received.
pub async fn spawn_webhook(status: StatusCode, body: &'static str) -> (String, Arc<Mutex<Vec<Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();

    let app = Router::new().route(
        "/webhook/report",
        post(move |Json(payload): Json<Value>| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(payload);
                (status, body)
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/webhook/report", addr), received)
}

/// Webhook that answers only after `delay`, for exercising client timeouts.
pub async fn spawn_slow_webhook(delay: Duration) -> String {
    let app = Router::new().route(
        "/webhook/report",
        post(move || async move {
            tokio::time::sleep(delay).await;
            (StatusCode::OK, "too late")
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/webhook/report", addr)
}

/// `application/x-www-form-urlencoded` encoding of one value.
pub fn form_encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            b' ' => "+".to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect()
}
