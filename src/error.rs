use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

use crate::auth::Forbidden;
use crate::db::models::User;
use crate::db::StoreError;
use crate::routes::pages::{ErrorTemplate, Html};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    /// No session; the visitor is sent to the login form.
    #[error("Login required")]
    LoginRequired,

    #[error("Forbidden: {reason}")]
    Forbidden { user: Box<User>, reason: Forbidden },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn forbidden(user: User, reason: Forbidden) -> Self {
        AppError::Forbidden {
            user: Box::new(user),
            reason,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            AppError::LoginRequired => Redirect::to("/login").into_response(),
            AppError::Forbidden { user, reason } => {
                tracing::warn!(user_id = user.id, %reason, "Forbidden");
                let page = Html(ErrorTemplate {
                    user: Some(*user),
                    message: reason.message().to_string(),
                });
                (StatusCode::FORBIDDEN, page).into_response()
            }
            AppError::Store(e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
                    .into_response()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
