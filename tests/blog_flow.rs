//! End-to-end tests driving the real router.
//!
//! Tests cover:
//! - Signup, login and logout with the signed session cookie
//! - Ownership checks on posts and comments
//! - Like exclusivity (no self-likes, one like per user)
//! - Forged and stale cookies behaving like anonymous visitors

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use bitacora::auth::{SessionManager, SigningSecret};
use bitacora::db::{self, BlogStore, SqliteStore};
use bitacora::routes;
use bitacora::state::AppState;

struct TestApp {
    router: Router,
    store: SqliteStore,
    _tmp: TempDir,
}

fn test_app() -> TestApp {
    let tmp = TempDir::new().unwrap();
    let pool =
        db::create_pool(&tmp.path().join("blog.db")).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    let store = SqliteStore::new(pool);

    let state = AppState {
        store: store.clone(),
        sessions: Arc::new(SessionManager::new(
            &SigningSecret::new("integration-secret"),
            "user_id",
        )),
    };

    TestApp {
        router: routes::app(state),
        store,
        _tmp: tmp,
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut req = Request::get(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut req = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        self.send(req.body(Body::from(body.to_string())).unwrap()).await
    }

    /// Sign up and return the `user_id=...` cookie pair.
    async fn signup(&self, username: &str, password: &str) -> String {
        let body = format!("username={username}&password={password}&verify={password}&email=");
        let resp = self.post_form("/signup", &body, None).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        session_cookie(&resp).expect("signup should set a session cookie")
    }

    async fn create_post(&self, cookie: &str, subject: &str, content: &str) -> i64 {
        let body = format!("subject={subject}&content={content}");
        let resp = self.post_form("/blog/newpost", &body, Some(cookie)).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        location(&resp)
            .trim_start_matches("/blog/")
            .parse()
            .expect("redirect should point at the new post")
    }
}

fn session_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("user_id="))
        .map(|v| v.split(';').next().unwrap().to_string())
}

fn location(resp: &Response<Body>) -> String {
    resp.headers()[header::LOCATION].to_str().unwrap().to_string()
}

async fn body_text(resp: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn alice_and_bob_scenario() {
    let app = test_app();

    let alice = app.signup("alice", "pw123").await;

    let resp = app
        .post_form("/login", "username=alice&password=pw123", None)
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/blog");
    assert!(session_cookie(&resp).is_some());

    let resp = app
        .post_form("/login", "username=alice&password=wrong", None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(session_cookie(&resp).is_none());
    assert!(body_text(resp).await.contains("Invalid login"));

    let post_id = app.create_post(&alice, "Hi", "Hello+World").await;
    let post = app.store.find_post_by_id(post_id).unwrap().unwrap();
    assert_eq!(post.created_by, "alice");
    assert_eq!(post.subject, "Hi");
    assert_eq!(post.content, "Hello World");

    let bob = app.signup("bob", "pw456").await;

    let like_uri = format!("/blog/{post_id}/like");
    let resp = app.post_form(&like_uri, "", Some(&bob)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let post = app.store.find_post_by_id(post_id).unwrap().unwrap();
    assert_eq!(post.like_count, 1);
    assert_eq!(post.liked_by, BTreeSet::from(["bob".to_string()]));

    let resp = app.post_form(&like_uri, "", Some(&bob)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        app.store.find_post_by_id(post_id).unwrap().unwrap().like_count,
        1
    );

    let resp = app.post_form(&like_uri, "", Some(&alice)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(body_text(resp).await.contains("like your own post"));
    assert_eq!(
        app.store.find_post_by_id(post_id).unwrap().unwrap().like_count,
        1
    );

    let delete_uri = format!("/blog/{post_id}/deletepost");
    let resp = app.post_form(&delete_uri, "", Some(&bob)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(app.store.find_post_by_id(post_id).unwrap().is_some());

    let resp = app.post_form(&delete_uri, "", Some(&alice)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(app.store.find_post_by_id(post_id).unwrap().is_none());
}

#[tokio::test]
async fn anonymous_mutations_redirect_to_login() {
    let app = test_app();
    let alice = app.signup("alice", "pw123").await;
    let post_id = app.create_post(&alice, "Hi", "Hello").await;

    for uri in [
        "/blog/newpost".to_string(),
        format!("/blog/{post_id}/like"),
        format!("/blog/{post_id}/deletepost"),
        format!("/blog/{post_id}/updatepost"),
        format!("/blog/{post_id}/newcomment"),
    ] {
        let resp = app.post_form(&uri, "subject=a&content=b&comment=c", None).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&resp), "/login", "{uri}");
    }

    let post = app.store.find_post_by_id(post_id).unwrap().unwrap();
    assert_eq!(post.like_count, 0);
    assert!(app.store.list_comments_for_post(post_id).unwrap().is_empty());
}

#[tokio::test]
async fn forged_cookie_is_treated_as_anonymous() {
    let app = test_app();
    let alice = app.signup("alice", "pw123").await;
    let bob = app.signup("bob", "pw456").await;
    let post_id = app.create_post(&alice, "Hi", "Hello").await;

    // bob's signature with alice's id
    let bob_mac = bob.rsplit_once('|').unwrap().1;
    let alice_id = alice.trim_start_matches("user_id=").split('|').next().unwrap();
    let forged = format!("user_id={alice_id}|{bob_mac}");

    let resp = app
        .post_form(&format!("/blog/{post_id}/deletepost"), "", Some(&forged))
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
    assert!(app.store.find_post_by_id(post_id).unwrap().is_some());
}

#[tokio::test]
async fn missing_post_is_not_found() {
    let app = test_app();
    let alice = app.signup("alice", "pw123").await;

    assert_eq!(app.get("/blog/999", None).await.status(), StatusCode::NOT_FOUND);
    let resp = app.post_form("/blog/999/like", "", Some(&alice)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = app.post_form("/blog/999/deletepost", "", Some(&alice)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn signup_reports_field_errors_and_duplicates() {
    let app = test_app();

    let resp = app
        .post_form("/signup", "username=a&password=pw&verify=pw&email=nope", None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(session_cookie(&resp).is_none());
    let html = body_text(resp).await;
    assert!(html.contains("not a valid username."));
    assert!(html.contains("valid password."));
    assert!(html.contains("not a valid email."));

    let resp = app
        .post_form("/signup", "username=alice&password=pw123&verify=pw124&email=", None)
        .await;
    assert!(body_text(resp).await.contains("Your passwords didn"));

    app.signup("alice", "pw123").await;
    let resp = app
        .post_form("/signup", "username=alice&password=pw999&verify=pw999&email=", None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(session_cookie(&resp).is_none());
    assert!(body_text(resp).await.contains("That user already exists."));
}

#[tokio::test]
async fn logged_in_users_cannot_sign_up_again() {
    let app = test_app();
    let alice = app.signup("alice", "pw123").await;

    let resp = app
        .post_form("/signup", "username=other&password=pw123&verify=pw123&email=", Some(&alice))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Logout before to signup"));
    assert!(app.store.find_user_by_name("other").unwrap().is_none());

    let resp = app.get("/login", Some(&alice)).await;
    assert!(body_text(resp).await.contains("You need to log out to login again"));
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let app = test_app();
    let alice = app.signup("alice", "pw123").await;

    let resp = app.get("/logout", Some(&alice)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let cleared = resp.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cleared.starts_with("user_id=;"));
    assert!(cleared.contains("Path=/"));

    let resp = app.get("/blog/newpost", Some("user_id=")).await;
    assert_eq!(location(&resp), "/login");

    let resp = app.get("/logout", None).await;
    assert!(body_text(resp).await.contains("logged in to log out first"));
}

#[tokio::test]
async fn only_the_author_edits_a_post() {
    let app = test_app();
    let alice = app.signup("alice", "pw123").await;
    let bob = app.signup("bob", "pw456").await;
    let post_id = app.create_post(&alice, "Hi", "Hello").await;
    let uri = format!("/blog/{post_id}/updatepost");

    assert_eq!(app.get(&uri, Some(&bob)).await.status(), StatusCode::FORBIDDEN);
    let resp = app.post_form(&uri, "subject=Hacked&content=x", Some(&bob)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    assert_eq!(app.get(&uri, Some(&alice)).await.status(), StatusCode::OK);
    let resp = app.post_form(&uri, "subject=&content=x", Some(&alice)).await;
    assert!(body_text(resp).await.contains("subject and content, please!"));

    let resp = app
        .post_form(&uri, "subject=Edited&content=Updated", Some(&alice))
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), format!("/blog/{post_id}"));

    let post = app.store.find_post_by_id(post_id).unwrap().unwrap();
    assert_eq!(post.subject, "Edited");
    assert_eq!(post.content, "Updated");
}

#[tokio::test]
async fn only_the_commenter_edits_a_comment() {
    let app = test_app();
    let alice = app.signup("alice", "pw123").await;
    let bob = app.signup("bob", "pw456").await;
    let post_id = app.create_post(&alice, "Hi", "Hello").await;
    let other_post = app.create_post(&alice, "Other", "Post").await;

    let resp = app
        .post_form(&format!("/blog/{post_id}/newcomment"), "comment=", Some(&bob))
        .await;
    assert!(body_text(resp).await.contains("please provide a comment!"));

    let resp = app
        .post_form(&format!("/blog/{post_id}/newcomment"), "comment=Nice+post", Some(&bob))
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let comments = app.store.list_comments_for_post(post_id).unwrap();
    assert_eq!(comments.len(), 1);
    let comment_id = comments[0].id;

    let page = body_text(app.get(&format!("/blog/{post_id}"), None).await).await;
    assert!(page.contains("Nice post"));

    let edit_uri = format!("/blog/{post_id}/updatecomment/{comment_id}");
    let resp = app.post_form(&edit_uri, "comment=Rude", Some(&alice)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Right comment, wrong post
    let resp = app
        .post_form(
            &format!("/blog/{other_post}/updatecomment/{comment_id}"),
            "comment=Moved",
            Some(&bob),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.post_form(&edit_uri, "comment=Great+post", Some(&bob)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        app.store.find_comment_by_id(comment_id).unwrap().unwrap().text,
        "Great post"
    );

    let delete_uri = format!("/blog/{post_id}/deletecomment/{comment_id}");
    let resp = app.post_form(&delete_uri, "", Some(&alice)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = app.post_form(&delete_uri, "", Some(&bob)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(app.store.find_comment_by_id(comment_id).unwrap().is_none());
}

#[tokio::test]
async fn front_page_lists_posts_newest_first() {
    let app = test_app();
    let alice = app.signup("alice", "pw123").await;
    app.create_post(&alice, "First", "one").await;
    app.create_post(&alice, "Second", "two").await;

    let resp = app.get("/blog", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    let first = html.find("First").unwrap();
    let second = html.find("Second").unwrap();
    assert!(second < first);
    assert!(html.contains("/login"));
}
