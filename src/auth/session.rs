use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::signer::{CookieSigner, SigningSecret};
use crate::db::models::User;
use crate::db::{BlogStore, StoreError};
use crate::error::AppError;
use crate::state::AppState;

/// Stateless sessions: the cookie carries the signed user id and nothing is
/// kept server-side.
#[derive(Debug, Clone)]
pub struct SessionManager {
    signer: CookieSigner,
    cookie_name: String,
}

/// Session resolved for the current request, cached in request extensions.
#[derive(Debug, Clone)]
pub struct ActingUser(pub Option<User>);

impl SessionManager {
    pub fn new(secret: &SigningSecret, cookie_name: impl Into<String>) -> Self {
        Self {
            signer: CookieSigner::new(secret),
            cookie_name: cookie_name.into(),
        }
    }

    /// Set-Cookie value for a fresh session. No Max-Age, so it lasts until
    /// the browser closes.
    pub fn establish(&self, user_id: i64) -> String {
        format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/",
            self.cookie_name,
            self.signer.sign(&user_id.to_string())
        )
    }

    /// Set-Cookie value that overwrites the session cookie on the same path.
    pub fn clear(&self) -> String {
        format!("{}=; HttpOnly; SameSite=Lax; Path=/", self.cookie_name)
    }

    /// Resolve the request's session to a user. Missing, forged or stale
    /// cookies are all simply anonymous; only storage failures are errors.
    pub fn resolve<S: BlogStore + ?Sized>(
        &self,
        headers: &HeaderMap,
        store: &S,
    ) -> Result<Option<User>, StoreError> {
        let Some(token) = get_cookie_value(headers, &self.cookie_name) else {
            return Ok(None);
        };
        if token.is_empty() {
            return Ok(None);
        }
        let Some(value) = self.signer.verify(token) else {
            tracing::debug!("Ignoring session cookie with bad signature");
            return Ok(None);
        };
        let Ok(user_id) = value.parse::<i64>() else {
            return Ok(None);
        };

        let user = store.find_user_by_id(user_id)?;
        if user.is_none() {
            tracing::debug!(user_id, "Session refers to a missing user");
        }
        Ok(user)
    }
}

pub fn get_cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val)
            } else {
                None
            }
        })
}

/// Middleware: resolve the session once, before any handler runs.
pub async fn resolve_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = state.sessions.resolve(req.headers(), &state.store)?;
    req.extensions_mut().insert(ActingUser(user));
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{memory_pool, run_migrations, SqliteStore};
    use axum::http::HeaderValue;

    fn store() -> SqliteStore {
        let pool = memory_pool().unwrap();
        run_migrations(&pool).unwrap();
        SqliteStore::new(pool)
    }

    fn manager() -> SessionManager {
        SessionManager::new(&SigningSecret::new("session-test"), "user_id")
    }

    /// Turn a Set-Cookie value into the Cookie header a browser would send.
    fn cookie_headers(set_cookie: &str) -> HeaderMap {
        let pair = set_cookie.split(';').next().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(pair).unwrap());
        headers
    }

    #[test]
    fn establish_emits_session_cookie() {
        let cookie = manager().establish(42);
        assert!(cookie.starts_with("user_id=42|"));
        assert!(cookie.contains("Path=/"));
        assert!(!cookie.contains("Max-Age"));
        assert!(!cookie.contains("Expires"));
    }

    #[test]
    fn clear_emits_empty_cookie_on_same_path() {
        assert_eq!(manager().clear(), "user_id=; HttpOnly; SameSite=Lax; Path=/");
    }

    #[test]
    fn session_round_trip_resolves_user() {
        let store = store();
        let alice = store.create_user("alice", "a,b", None).unwrap();
        let sessions = manager();

        let headers = cookie_headers(&sessions.establish(alice.id));
        assert_eq!(sessions.resolve(&headers, &store).unwrap(), Some(alice));
    }

    #[test]
    fn deleted_user_resolves_to_none() {
        let pool = memory_pool().unwrap();
        run_migrations(&pool).unwrap();
        let store = SqliteStore::new(pool.clone());
        let alice = store.create_user("alice", "a,b", None).unwrap();
        let sessions = manager();
        let headers = cookie_headers(&sessions.establish(alice.id));
        assert!(sessions.resolve(&headers, &store).unwrap().is_some());

        // no account deletion flow exists, so remove the row directly
        pool.get()
            .unwrap()
            .execute("DELETE FROM users WHERE id = ?1", [alice.id])
            .unwrap();
        assert_eq!(sessions.resolve(&headers, &store).unwrap(), None);
    }

    #[test]
    fn absent_or_cleared_cookie_is_anonymous() {
        let store = store();
        let sessions = manager();
        assert_eq!(sessions.resolve(&HeaderMap::new(), &store).unwrap(), None);
        let cleared = cookie_headers(&sessions.clear());
        assert_eq!(sessions.resolve(&cleared, &store).unwrap(), None);
    }

    #[test]
    fn forged_cookie_is_anonymous() {
        let store = store();
        let alice = store.create_user("alice", "a,b", None).unwrap();
        let bob = store.create_user("bob", "c,d", None).unwrap();
        let sessions = manager();

        let genuine = sessions.establish(alice.id);
        let forged = genuine.replacen(
            &format!("user_id={}|", alice.id),
            &format!("user_id={}|", bob.id),
            1,
        );
        assert_eq!(sessions.resolve(&cookie_headers(&forged), &store).unwrap(), None);

        let foreign = SessionManager::new(&SigningSecret::new("elsewhere"), "user_id");
        let headers = cookie_headers(&foreign.establish(alice.id));
        assert_eq!(sessions.resolve(&headers, &store).unwrap(), None);
    }

    #[test]
    fn non_numeric_value_is_anonymous() {
        let store = store();
        let signer = CookieSigner::new(&SigningSecret::new("session-test"));
        let mut headers = HeaderMap::new();
        let cookie = format!("user_id={}", signer.sign("alice"));
        headers.insert(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());
        assert_eq!(manager().resolve(&headers, &store).unwrap(), None);
    }

    #[test]
    fn finds_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; user_id=1|abc; lang=en"),
        );
        assert_eq!(get_cookie_value(&headers, "user_id"), Some("1|abc"));
        assert_eq!(get_cookie_value(&headers, "missing"), None);
    }
}
