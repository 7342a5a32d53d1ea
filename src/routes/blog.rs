use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::auth::policy;
use crate::auth::Forbidden;
use crate::db::models::{LikeOutcome, Post, User};
use crate::db::BlogStore;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::authorize;
use crate::routes::pages::{
    CommentView, DeletedTemplate, FrontTemplate, Html, PermalinkTemplate, PostFormTemplate,
    PostView,
};
use crate::state::AppState;

const MISSING_FIELDS: &str = "subject and content, please!";

#[derive(Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub content: String,
}

impl PostForm {
    fn is_complete(&self) -> bool {
        !self.subject.trim().is_empty() && !self.content.trim().is_empty()
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(front))
        .route("/blog", get(front))
        .route("/blog/", get(front))
        .route("/blog/newpost", get(new_post_page).post(new_post_submit))
        .route("/blog/{id}", get(permalink))
        .route(
            "/blog/{id}/updatepost",
            get(edit_post_page).post(edit_post_submit),
        )
        .route("/blog/{id}/deletepost", post(delete_post))
        .route("/blog/{id}/like", post(like_post))
}

pub(crate) fn load_post(state: &AppState, id: i64) -> AppResult<Post> {
    state.store.find_post_by_id(id)?.ok_or(AppError::NotFound)
}

fn comment_views(
    state: &AppState,
    post_id: i64,
    viewer: Option<&User>,
) -> AppResult<Vec<CommentView>> {
    state
        .store
        .list_comments_for_post(post_id)?
        .into_iter()
        .map(|comment| {
            let author = state
                .store
                .find_user_by_id(comment.owner_id)?
                .map(|u| u.name)
                .unwrap_or_else(|| "[deleted]".to_string());
            Ok(CommentView {
                can_edit: policy::can_edit_or_delete_comment(viewer, &comment),
                author,
                comment,
            })
        })
        .collect()
}

/// GET / and /blog
pub async fn front(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Response> {
    let posts = state
        .store
        .list_posts()?
        .into_iter()
        .map(|post| PostView::new(post, user.as_ref()))
        .collect();
    Ok(Html(FrontTemplate { user, posts }).into_response())
}

/// GET /blog/{id}
pub async fn permalink(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let post = load_post(&state, id)?;
    let comments = comment_views(&state, post.id, user.as_ref())?;
    let view = PostView::new(post, user.as_ref());
    Ok(Html(PermalinkTemplate {
        user,
        view,
        comments,
    })
    .into_response())
}

/// GET /blog/newpost
pub async fn new_post_page(CurrentUser(user): CurrentUser) -> Response {
    Html(PostFormTemplate {
        user: Some(user),
        heading: "New post",
        action: "/blog/newpost".to_string(),
        subject: String::new(),
        content: String::new(),
        error: String::new(),
    })
    .into_response()
}

/// POST /blog/newpost
pub async fn new_post_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    if !form.is_complete() {
        return Ok(Html(PostFormTemplate {
            user: Some(user),
            heading: "New post",
            action: "/blog/newpost".to_string(),
            subject: form.subject,
            content: form.content,
            error: MISSING_FIELDS.to_string(),
        })
        .into_response());
    }

    let post = state
        .store
        .create_post(&user.name, &form.subject, &form.content)?;
    tracing::info!(post_id = post.id, created_by = %post.created_by, "Created post");
    Ok(Redirect::to(&format!("/blog/{}", post.id)).into_response())
}

/// GET /blog/{id}/updatepost
pub async fn edit_post_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let post = load_post(&state, id)?;
    let allowed = policy::can_edit_or_delete_post(Some(&user), &post);
    let user = authorize(user, allowed, Forbidden::PostOwnership)?;

    Ok(Html(PostFormTemplate {
        user: Some(user),
        heading: "Edit post",
        action: format!("/blog/{}/updatepost", post.id),
        subject: post.subject,
        content: post.content,
        error: String::new(),
    })
    .into_response())
}

/// POST /blog/{id}/updatepost
pub async fn edit_post_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let post = load_post(&state, id)?;
    let allowed = policy::can_edit_or_delete_post(Some(&user), &post);
    let user = authorize(user, allowed, Forbidden::PostOwnership)?;

    if !form.is_complete() {
        return Ok(Html(PostFormTemplate {
            user: Some(user),
            heading: "Edit post",
            action: format!("/blog/{}/updatepost", post.id),
            subject: form.subject,
            content: form.content,
            error: MISSING_FIELDS.to_string(),
        })
        .into_response());
    }

    if !state.store.update_post(post.id, &form.subject, &form.content)? {
        return Err(AppError::NotFound);
    }
    tracing::info!(post_id = post.id, "Updated post");
    Ok(Redirect::to(&format!("/blog/{}", post.id)).into_response())
}

/// POST /blog/{id}/deletepost
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let post = load_post(&state, id)?;
    let allowed = policy::can_edit_or_delete_post(Some(&user), &post);
    let user = authorize(user, allowed, Forbidden::PostOwnership)?;

    state.store.delete_post(post.id)?;
    tracing::info!(post_id = post.id, "Deleted post");
    Ok(Html(DeletedTemplate { user: Some(user) }).into_response())
}

/// POST /blog/{id}/like
pub async fn like_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let mut post = load_post(&state, id)?;
    if let Err(denial) = policy::apply_like(&mut post, &user) {
        return Err(AppError::forbidden(user, denial));
    }

    // The in-memory check above only rejects early; storage re-checks atomically.
    match state.store.like_post(post.id, &user.name)? {
        LikeOutcome::Liked => {
            tracing::info!(post_id = post.id, likes = post.like_count, "Liked post");
            Ok(Redirect::to("/blog").into_response())
        }
        LikeOutcome::SelfLike | LikeOutcome::AlreadyLiked => {
            Err(AppError::forbidden(user, Forbidden::Like))
        }
        LikeOutcome::PostMissing => Err(AppError::NotFound),
    }
}
