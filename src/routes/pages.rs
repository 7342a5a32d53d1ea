use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::auth::policy;
use crate::db::models::{Comment, Post, User};

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// A post together with what the viewer may do with it.
pub struct PostView {
    pub post: Post,
    pub can_edit: bool,
    pub can_like: bool,
}

impl PostView {
    pub fn new(post: Post, viewer: Option<&User>) -> Self {
        Self {
            can_edit: policy::can_edit_or_delete_post(viewer, &post),
            can_like: policy::can_like_post(viewer, &post),
            post,
        }
    }
}

pub struct CommentView {
    pub comment: Comment,
    pub author: String,
    pub can_edit: bool,
}

#[derive(Template)]
#[template(path = "front.html")]
pub struct FrontTemplate {
    pub user: Option<User>,
    pub posts: Vec<PostView>,
}

#[derive(Template)]
#[template(path = "permalink.html")]
pub struct PermalinkTemplate {
    pub user: Option<User>,
    pub view: PostView,
    pub comments: Vec<CommentView>,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub user: Option<User>,
    pub heading: &'static str,
    pub action: String,
    pub subject: String,
    pub content: String,
    pub error: String,
}

#[derive(Template)]
#[template(path = "deleted.html")]
pub struct DeletedTemplate {
    pub user: Option<User>,
}

#[derive(Template)]
#[template(path = "comment_form.html")]
pub struct CommentFormTemplate {
    pub user: Option<User>,
    pub heading: &'static str,
    pub action: String,
    pub subject: String,
    pub content: String,
    pub comment: String,
    pub error: String,
}

#[derive(Template, Default)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub user: Option<User>,
    pub username: String,
    pub email: String,
    pub error_username: String,
    pub error_password: String,
    pub error_verify: String,
    pub error_email: String,
    pub log_error: String,
}

#[derive(Template, Default)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub user: Option<User>,
    pub username: String,
    pub error: String,
    pub log_error: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub user: Option<User>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn user(id: i64, name: &str) -> User {
        User {
            id,
            name: name.into(),
            pw_hash: "salt,digest".into(),
            email: None,
            created: "2024-01-01 00:00:00".into(),
        }
    }

    fn post() -> Post {
        Post {
            id: 7,
            subject: "Hi".into(),
            content: "<script>alert(1)</script>".into(),
            created_by: "alice".into(),
            like_count: 3,
            liked_by: BTreeSet::new(),
            created: "2024-01-01 00:00:00".into(),
            last_modified: "2024-01-01 00:00:00".into(),
        }
    }

    #[test]
    fn front_page_escapes_content() {
        let page = FrontTemplate {
            user: None,
            posts: vec![PostView::new(post(), None)],
        };
        let html = page.render().unwrap();
        assert!(html.contains("Hi"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn owner_sees_edit_links_others_see_like() {
        let alice = user(1, "alice");
        let bob = user(2, "bob");

        let owner_view = PostView::new(post(), Some(&alice));
        assert!(owner_view.can_edit && !owner_view.can_like);

        let html = PermalinkTemplate {
            user: Some(bob.clone()),
            view: PostView::new(post(), Some(&bob)),
            comments: vec![],
        }
        .render()
        .unwrap();
        assert!(html.contains("/blog/7/like"));
        assert!(!html.contains("/blog/7/updatepost"));
        assert!(html.contains("bob"));
    }

    #[test]
    fn signup_form_shows_field_errors() {
        let html = SignupTemplate {
            username: "a".into(),
            error_username: "That's not a valid username.".into(),
            ..Default::default()
        }
        .render()
        .unwrap();
        assert!(html.contains("not a valid username."));
        assert!(html.contains("value=\"a\""));
    }
}
