pub mod auth;
pub mod blog;
pub mod comments;
pub mod pages;

use axum::middleware;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::session::resolve_session;
use crate::auth::Forbidden;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Full application router. The session is resolved once per request by
/// middleware before any handler runs.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(blog::router())
        .merge(comments::router())
        .layer(middleware::from_fn_with_state(state.clone(), resolve_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Turn a policy decision into a handler outcome, handing the user back on
/// success.
pub(crate) fn authorize(user: User, allowed: bool, denial: Forbidden) -> AppResult<User> {
    if allowed {
        Ok(user)
    } else {
        Err(AppError::forbidden(user, denial))
    }
}
