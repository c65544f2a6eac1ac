//! Streamapp backend server
//! Mission: Register users, hand out cookie sessions, gate player actions

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::{path::Path, time::Duration};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamapp_backend::{
    auth::{sweeper, AuthDb, AuthState, SessionStore, UserStore},
    create_router,
    models::{resolve_data_path, Config},
};

/// Command-line overrides for the environment configuration
#[derive(Debug, Parser)]
#[command(name = "streamapp", version, about = "Auth and session backend")]
struct Cli {
    /// SQLite database file for users and sessions
    #[arg(long, env = "AUTH_DB_PATH")]
    db_path: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Single origin allowed to make credentialed requests
    #[arg(long, env = "ALLOWED_ORIGIN")]
    allowed_origin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(db_path) = cli.db_path {
        config.database_path = resolve_data_path(Some(db_path), "streamapp.db");
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(origin) = cli.allowed_origin {
        config.allowed_origin = origin;
    }

    info!("🚀 Streamapp backend starting");

    let db = AuthDb::open(&config.database_path)
        .with_context(|| format!("Failed to open auth database at {}", config.database_path))?;

    let registered = UserStore::new(db.clone())
        .count()
        .context("Failed to count users")?;
    info!("👥 Registered users: {}", registered);

    let auth_state = AuthState::from_config(db.clone(), &config)
        .context("Failed to initialize authentication")?;

    if !config.cookie_secure {
        info!("⚠️  Session cookies issued without the Secure flag");
    }

    sweeper::spawn(
        SessionStore::new(db),
        Duration::from_secs(config.session_sweep_interval_secs),
    );

    let app = create_router(auth_state, &config.allowed_origin)?;

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🎯 API server listening on {} (origin {})", addr, config.allowed_origin);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("👋 Server stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streamapp_backend=debug,streamapp=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate dir when launched from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
