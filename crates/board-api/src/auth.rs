use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use minijinja::context;
use tracing::{error, info, warn};
use uuid::Uuid;

use board_db::models::UserRow;
use board_db::{UserRepository, is_unique_violation};
use board_types::api::CredentialsForm;
use board_types::models::{Identity, Viewer};

use crate::{AppState, blocking};
use crate::error::{AuthError, internal};
use crate::session;

// -- Authenticator --

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// Salted-hash comparison. A malformed stored hash never verifies.
pub fn verify_password(password_hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        error!("Stored password hash is malformed");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn identity_from_row(row: UserRow) -> anyhow::Result<Identity> {
    Ok(Identity {
        id: row.id.parse()?,
        username: row.username,
        password_hash: row.password,
    })
}

/// Create an account. The name check and insert are separate statements;
/// a concurrent registration that wins the race surfaces here as
/// `UsernameTaken` via the UNIQUE index.
pub fn register<R>(users: &R, username: &str, password: &str) -> Result<Identity, AuthError>
where
    R: UserRepository + ?Sized,
{
    if username.trim().is_empty() || password.is_empty() {
        return Err(AuthError::MissingFields);
    }

    if users.user_by_username(username)?.is_some() {
        return Err(AuthError::UsernameTaken);
    }

    let identity = Identity {
        id: Uuid::new_v4(),
        username: username.to_string(),
        password_hash: hash_password(password)?,
    };

    users
        .create_user(&identity.id.to_string(), &identity.username, &identity.password_hash)
        .map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::UsernameTaken
            } else {
                AuthError::Internal(e)
            }
        })?;

    info!("Registered user {}", identity.username);
    Ok(identity)
}

/// Unknown user and wrong password fail with the same error.
pub fn login<R>(users: &R, username: &str, password: &str) -> Result<Identity, AuthError>
where
    R: UserRepository + ?Sized,
{
    if username.trim().is_empty() || password.is_empty() {
        return Err(AuthError::MissingFields);
    }

    let identity = users
        .user_by_username(username)?
        .map(identity_from_row)
        .transpose()?
        .filter(|identity| verify_password(&identity.password_hash, password))
        .ok_or(AuthError::InvalidCredentials)?;

    Ok(identity)
}

/// Look up `username`, creating it with `default_password` when absent.
pub fn find_or_create<R>(users: &R, username: &str, default_password: &str) -> Result<Identity, AuthError>
where
    R: UserRepository + ?Sized,
{
    if let Some(row) = users.user_by_username(username)? {
        return Ok(identity_from_row(row)?);
    }

    match register(users, username, default_password) {
        Ok(identity) => {
            info!("Provisioned user {} for bot posting", username);
            Ok(identity)
        }
        // created by someone else between the lookup and the insert
        Err(AuthError::UsernameTaken) => users
            .user_by_username(username)?
            .map(identity_from_row)
            .transpose()?
            .ok_or(AuthError::UsernameTaken),
        Err(e) => Err(e),
    }
}

// -- Handlers --

pub async fn register_form(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Response, StatusCode> {
    if viewer.is_authenticated() {
        return Ok(Redirect::to("/").into_response());
    }
    credentials_page(&state, "register.html", StatusCode::OK, None, "")
}

pub async fn register_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, StatusCode> {
    let db = state.clone();
    let username = form.username.clone();
    let result = blocking(move || {
        let identity = register(&db.db, &form.username, &form.password)?;
        Ok::<_, AuthError>(session::start_session(&db.db, &db.settings, &identity)?)
    })
    .await?;

    match result {
        Ok(cookie) => Ok((jar.add(cookie), Redirect::to("/")).into_response()),
        Err(AuthError::Internal(e)) => Err(internal("registration failed")(e)),
        Err(e) => {
            warn!("Registration rejected for '{}': {}", username, e);
            credentials_page(&state, "register.html", rejection_status(&e), Some(e.to_string()), &username)
        }
    }
}

pub async fn login_form(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Response, StatusCode> {
    if viewer.is_authenticated() {
        return Ok(Redirect::to("/").into_response());
    }
    credentials_page(&state, "login.html", StatusCode::OK, None, "")
}

pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, StatusCode> {
    let db = state.clone();
    let username = form.username.clone();
    let result = blocking(move || {
        let identity = login(&db.db, &form.username, &form.password)?;
        Ok::<_, AuthError>(session::start_session(&db.db, &db.settings, &identity)?)
    })
    .await?;

    match result {
        Ok(cookie) => Ok((jar.add(cookie), Redirect::to("/")).into_response()),
        Err(AuthError::Internal(e)) => Err(internal("login failed")(e)),
        Err(e) => {
            warn!("Login failed for '{}'", username);
            credentials_page(&state, "login.html", rejection_status(&e), Some(e.to_string()), &username)
        }
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<Response, StatusCode> {
    let jar = blocking(move || session::end_session(&state.db, &state.settings, jar))
        .await?
        .map_err(internal("logout failed"))?;
    Ok((jar, Redirect::to("/login")).into_response())
}

fn rejection_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::UsernameTaken => StatusCode::CONFLICT,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::MissingFields => StatusCode::BAD_REQUEST,
        AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn credentials_page(
    state: &AppState,
    template: &str,
    status: StatusCode,
    error: Option<String>,
    username: &str,
) -> Result<Response, StatusCode> {
    let html = state
        .templates
        .page(template, context! { error, form_username => username })?;
    Ok((status, html).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_db::Database;

    #[test]
    fn password_hash_is_salted_and_verifies() {
        let a = hash_password("hunter2").unwrap();
        let b = hash_password("hunter2").unwrap();
        assert_ne!(a, b);
        assert!(!a.contains("hunter2"));
        assert!(verify_password(&a, "hunter2"));
        assert!(!verify_password(&a, "hunter3"));
        assert!(!verify_password("not-a-hash", "hunter2"));
    }

    #[test]
    fn register_then_login() {
        let db = Database::open_in_memory().unwrap();
        let registered = register(&db, "alice", "pw").unwrap();
        let logged_in = login(&db, "alice", "pw").unwrap();
        assert_eq!(registered.id, logged_in.id);
        assert_eq!(logged_in.username, "alice");
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "alice", "pw").unwrap();
        let err = register(&db, "alice", "other").unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn login_failures_are_indistinguishable() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "alice", "pw").unwrap();

        let wrong_password = login(&db, "alice", "nope").unwrap_err();
        let unknown_user = login(&db, "mallory", "pw").unwrap_err();
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[test]
    fn blank_credentials_are_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(register(&db, "  ", "pw"), Err(AuthError::MissingFields)));
        assert!(matches!(register(&db, "bob", ""), Err(AuthError::MissingFields)));
        assert!(matches!(login(&db, "", ""), Err(AuthError::MissingFields)));
    }

    #[test]
    fn find_or_create_reuses_existing_user() {
        let db = Database::open_in_memory().unwrap();
        let first = find_or_create(&db, "Bot", "default").unwrap();
        let second = find_or_create(&db, "Bot", "default").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(db.count_users().unwrap(), 1);
        // provisioned accounts can log in with the default password
        assert!(login(&db, "Bot", "default").is_ok());
    }
}
