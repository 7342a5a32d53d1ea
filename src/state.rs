use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::session::SessionManager;
use crate::db::SqliteStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub store: SqliteStore,
    pub sessions: Arc<SessionManager>,
}
