use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bitacora::auth::{SessionManager, SigningSecret};
use bitacora::config::{Cli, Config};
use bitacora::db::{self, SqliteStore};
use bitacora::routes;
use bitacora::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    // The signing secret is read once here and only lives inside the session manager
    let secret = SigningSecret::load_or_create(config.auth.secret.as_deref(), &data_dir)?;
    let sessions = SessionManager::new(&secret, config.auth.cookie_name.clone());

    let state = AppState {
        store: SqliteStore::new(pool),
        sessions: Arc::new(sessions),
    };

    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
