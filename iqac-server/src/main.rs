//! iqac-server - IQAC portal backend
//!
//! Resolves the root folder, opens (or creates) the database, makes sure
//! an administrator exists and serves the JSON API.

use anyhow::{Context, Result};
use clap::Parser;
use iqac_common::config::{resolve_root_folder, RootFolder, ServerSettings, ROOT_FOLDER_ENV};
use iqac_common::db::{init_database, load_jwt_secret};
use iqac_server::bootstrap::ensure_admin;
use iqac_server::{build_router, AppState};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "iqac-server", version, about = "IQAC portal backend")]
struct Args {
    /// Root folder holding the database and uploads
    #[arg(long)]
    root_folder: Option<String>,

    /// Listen address (overrides the settings file)
    #[arg(long, env = "IQAC_HOST")]
    host: Option<String>,

    /// Listen port (overrides the settings file)
    #[arg(long, env = "IQAC_PORT")]
    port: Option<u16>,

    /// E-mail of the administrator created on first start
    #[arg(long, env = "IQAC_ADMIN_EMAIL", default_value = "admin@iqac.local")]
    admin_email: String,

    /// Password of the administrator created on first start
    #[arg(long, env = "IQAC_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iqac_server=info,tower_http=info".into()),
        )
        .init();

    // Build identification first, before any database work
    info!(
        "Starting IQAC server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_path = resolve_root_folder(
        args.root_folder.as_deref(),
        ROOT_FOLDER_ENV,
        Some("root_folder"),
    )?;
    let root = RootFolder::new(root_path);
    root.ensure_directories()
        .with_context(|| format!("Cannot prepare root folder {}", root.path().display()))?;
    info!("Root folder: {}", root.path().display());

    let mut settings = ServerSettings::load(&root.settings_path())?;
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }

    let db_path = root.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Cannot open database {}", db_path.display()))?;

    let jwt_secret = match settings.jwt_secret.clone() {
        Some(secret) => {
            info!("Using token secret from {}", root.settings_path().display());
            secret
        }
        None => load_jwt_secret(&pool).await?,
    };

    ensure_admin(
        &pool,
        &args.admin_email,
        args.admin_password.as_deref(),
        settings.bcrypt_cost,
    )
    .await
    .context("Cannot create the administrator account")?;

    let addr = format!("{}:{}", settings.host, settings.port);
    let state = AppState::new(pool, settings, &jwt_secret, &root);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Cannot listen on {}", addr))?;
    info!("iqac-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("iqac-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
