use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::auth::policy;
use crate::auth::Forbidden;
use crate::db::models::{Comment, Post, User};
use crate::db::BlogStore;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::routes::authorize;
use crate::routes::blog::load_post;
use crate::routes::pages::{CommentFormTemplate, Html};
use crate::state::AppState;

const MISSING_COMMENT: &str = "please provide a comment!";

#[derive(Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub comment: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/blog/{id}/newcomment",
            get(new_comment_page).post(new_comment_submit),
        )
        .route(
            "/blog/{id}/updatecomment/{comment_id}",
            get(edit_comment_page).post(edit_comment_submit),
        )
        .route(
            "/blog/{id}/deletecomment/{comment_id}",
            post(delete_comment),
        )
}

/// Load a comment through its post. A comment that belongs to another post
/// is reported as missing.
fn load_comment(state: &AppState, post_id: i64, comment_id: i64) -> AppResult<(Post, Comment)> {
    let post = load_post(state, post_id)?;
    let comment = state
        .store
        .find_comment_by_id(comment_id)?
        .filter(|c| c.post_id == post.id)
        .ok_or(AppError::NotFound)?;
    Ok((post, comment))
}

fn comment_form(
    user: User,
    post: Post,
    heading: &'static str,
    action: String,
    comment: String,
    error: &str,
) -> Response {
    Html(CommentFormTemplate {
        user: Some(user),
        heading,
        action,
        subject: post.subject,
        content: post.content,
        comment,
        error: error.to_string(),
    })
    .into_response()
}

/// GET /blog/{id}/newcomment
pub async fn new_comment_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let post = load_post(&state, id)?;
    let action = format!("/blog/{}/newcomment", post.id);
    Ok(comment_form(user, post, "New comment", action, String::new(), ""))
}

/// POST /blog/{id}/newcomment
pub async fn new_comment_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let post = load_post(&state, id)?;

    if form.comment.trim().is_empty() {
        let action = format!("/blog/{}/newcomment", post.id);
        return Ok(comment_form(
            user,
            post,
            "New comment",
            action,
            form.comment,
            MISSING_COMMENT,
        ));
    }

    let comment = state.store.create_comment(post.id, user.id, &form.comment)?;
    tracing::info!(comment_id = comment.id, post_id = post.id, "Created comment");
    Ok(Redirect::to(&format!("/blog/{}", post.id)).into_response())
}

/// GET /blog/{id}/updatecomment/{comment_id}
pub async fn edit_comment_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, comment_id)): Path<(i64, i64)>,
) -> AppResult<Response> {
    let (post, comment) = load_comment(&state, id, comment_id)?;
    let allowed = policy::can_edit_or_delete_comment(Some(&user), &comment);
    let user = authorize(user, allowed, Forbidden::CommentOwnership)?;

    let action = format!("/blog/{}/updatecomment/{}", post.id, comment.id);
    Ok(comment_form(user, post, "Edit comment", action, comment.text, ""))
}

/// POST /blog/{id}/updatecomment/{comment_id}
pub async fn edit_comment_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, comment_id)): Path<(i64, i64)>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let (post, comment) = load_comment(&state, id, comment_id)?;
    let allowed = policy::can_edit_or_delete_comment(Some(&user), &comment);
    let user = authorize(user, allowed, Forbidden::CommentOwnership)?;

    if form.comment.trim().is_empty() {
        let action = format!("/blog/{}/updatecomment/{}", post.id, comment.id);
        return Ok(comment_form(
            user,
            post,
            "Edit comment",
            action,
            form.comment,
            MISSING_COMMENT,
        ));
    }

    if !state.store.update_comment(comment.id, &form.comment)? {
        return Err(AppError::NotFound);
    }
    tracing::info!(comment_id = comment.id, "Updated comment");
    Ok(Redirect::to(&format!("/blog/{}", post.id)).into_response())
}

/// POST /blog/{id}/deletecomment/{comment_id}
pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, comment_id)): Path<(i64, i64)>,
) -> AppResult<Response> {
    let (post, comment) = load_comment(&state, id, comment_id)?;
    let allowed = policy::can_edit_or_delete_comment(Some(&user), &comment);
    authorize(user, allowed, Forbidden::CommentOwnership)?;

    state.store.delete_comment(comment.id)?;
    tracing::info!(comment_id = comment.id, "Deleted comment");
    Ok(Redirect::to(&format!("/blog/{}", post.id)).into_response())
}
