use std::time::Duration;

use axum::{
    Extension, Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use minijinja::context;
use tracing::{info, warn};

use board_types::api::{ReportForm, ReportRequest};
use board_types::models::Identity;

use crate::AppState;
use crate::error::ReportError;
use crate::flash::{self, Flash};

/// How much of a failed upstream body is shown to the user.
const MAX_ERROR_BODY: usize = 500;

/// Client for the external report workflow. One call per request, no retries.
pub struct ReportRelay {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl ReportRelay {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, url, timeout))
    }

    /// Use a preconfigured client. `timeout` should match the client's and is
    /// only used for error messages.
    pub fn with_client(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send `raw_text` on behalf of `user` and return the response body
    /// untouched. Only HTTP 200 counts as success.
    pub async fn generate_report(&self, raw_text: &str, user: &Identity) -> Result<String, ReportError> {
        let payload = ReportRequest {
            user: user.username.clone(),
            raw_text: raw_text.to_string(),
        };

        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;

        if status != reqwest::StatusCode::OK {
            return Err(ReportError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        Ok(body)
    }

    fn transport_error(&self, e: reqwest::Error) -> ReportError {
        if e.is_timeout() {
            ReportError::Timeout(self.timeout.as_secs())
        } else {
            ReportError::Transport(e.to_string())
        }
    }
}

// -- Handlers --

/// GET /n8n-tools
pub async fn tools_page(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    jar: CookieJar,
) -> Result<Response, StatusCode> {
    let (jar, pending) = flash::take(jar);
    let pending = pending.unwrap_or_default();
    let error = Some(pending.error).filter(|e| !e.is_empty());

    let html = state.templates.page(
        "tools.html",
        context! {
            username => user.username,
            error,
            draft => pending.draft,
            truncated => pending.truncated,
        },
    )?;
    Ok((jar, html).into_response())
}

/// POST /generate_report
pub async fn generate_report(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    jar: CookieJar,
    Form(form): Form<ReportForm>,
) -> Result<Response, StatusCode> {
    if form.work_items.trim().is_empty() {
        let flash = Flash::new("Please describe your work items first", "");
        return Ok((flash::set(jar, &flash), Redirect::to("/n8n-tools")).into_response());
    }

    match state.relay.generate_report(&form.work_items, &user).await {
        Ok(report) => {
            info!("Report generated for {} ({} bytes)", user.username, report.len());
            let html = state.templates.page(
                "report.html",
                context! { username => user.username, report },
            )?;
            Ok(html.into_response())
        }
        Err(e) => {
            warn!("Report generation failed for {}: {}", user.username, e);
            let flash = Flash::new(e.to_string(), &form.work_items);
            if flash.truncated {
                warn!(
                    "Draft for {} kept {} of {} bytes in the flash cookie",
                    user.username,
                    flash.draft.len(),
                    form.work_items.len()
                );
            }
            Ok((flash::set(jar, &flash), Redirect::to("/n8n-tools")).into_response())
        }
    }
}
