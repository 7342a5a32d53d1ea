use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;

use crate::auth::accounts::{self, AuthError, SignupCompletion};
use crate::auth::validation::{Field, SignupForm};
use crate::db::models::User;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::routes::pages::{ErrorTemplate, Html, LoginTemplate, SignupTemplate};
use crate::state::AppState;

const ALREADY_SIGNED_UP: &str = "Logout before to signup";
const ALREADY_LOGGED_IN: &str = "You need to log out to login again";

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", get(signup_page).post(signup_submit))
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", get(logout).post(logout))
}

/// Set the session cookie and send the user to the front page.
fn start_session(state: &AppState, user: &User) -> Response {
    (
        [(header::SET_COOKIE, state.sessions.establish(user.id))],
        Redirect::to("/blog"),
    )
        .into_response()
}

/// GET /signup
pub async fn signup_page(MaybeUser(user): MaybeUser) -> Response {
    let log_error = if user.is_some() { ALREADY_SIGNED_UP } else { "" };
    Html(SignupTemplate {
        user,
        log_error: log_error.to_string(),
        ..Default::default()
    })
    .into_response()
}

/// POST /signup
pub async fn signup_submit(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<SignupForm>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(signup_page(MaybeUser(user)).await);
    }

    let mut page = SignupTemplate {
        username: form.username.clone(),
        email: form.email.clone(),
        ..Default::default()
    };

    match accounts::signup(&state.store, &form, SignupCompletion::Register) {
        Ok(new_user) => Ok(start_session(&state, &new_user)),
        Err(AuthError::Validation(errors)) => {
            let text = |field| errors.get(field).unwrap_or_default().to_string();
            page.error_username = text(Field::Username);
            page.error_password = text(Field::Password);
            page.error_verify = text(Field::Verify);
            page.error_email = text(Field::Email);
            Ok(Html(page).into_response())
        }
        Err(AuthError::Store(e)) => Err(e.into()),
        Err(err) => {
            page.error_username = err.to_string();
            Ok(Html(page).into_response())
        }
    }
}

/// GET /login
pub async fn login_page(MaybeUser(user): MaybeUser) -> Response {
    let log_error = if user.is_some() { ALREADY_LOGGED_IN } else { "" };
    Html(LoginTemplate {
        user,
        log_error: log_error.to_string(),
        ..Default::default()
    })
    .into_response()
}

/// POST /login
pub async fn login_submit(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(login_page(MaybeUser(user)).await);
    }

    match accounts::login(&state.store, &form.username, &form.password) {
        Ok(user) => {
            tracing::info!(user_id = user.id, "User logged in");
            Ok(start_session(&state, &user))
        }
        Err(AuthError::Store(e)) => Err(e.into()),
        Err(err) => {
            tracing::info!("Rejected login attempt");
            Ok(Html(LoginTemplate {
                user: None,
                username: form.username,
                error: err.to_string(),
                log_error: String::new(),
            })
            .into_response())
        }
    }
}

/// GET|POST /logout
pub async fn logout(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Response {
    match user {
        Some(user) => {
            tracing::info!(user_id = user.id, "User logged out");
            (
                [(header::SET_COOKIE, state.sessions.clear())],
                Redirect::to("/blog"),
            )
                .into_response()
        }
        None => Html(ErrorTemplate {
            user: None,
            message: "you need to be logged in to log out first".to_string(),
        })
        .into_response(),
    }
}
