use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::ActingUser;
use crate::db::models::User;
use crate::error::AppError;
use crate::state::AppState;

/// Session resolved by the `resolve_session` middleware, or resolved here if
/// the middleware is not mounted.
fn acting_user(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    if let Some(ActingUser(user)) = parts.extensions.get::<ActingUser>() {
        return Ok(user.clone());
    }
    Ok(state.sessions.resolve(&parts.headers, &state.store)?)
}

/// Extractor that requires a logged-in user.
/// Anonymous requests are redirected to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        acting_user(parts, state)?
            .map(CurrentUser)
            .ok_or(AppError::LoginRequired)
    }
}

/// Optional user extractor: `None` for anonymous visitors.
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(acting_user(parts, state)?))
    }
}
