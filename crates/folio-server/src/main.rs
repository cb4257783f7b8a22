use anyhow::Result;
use chrono::Utc;
use folio_inference::MockEngine;
use folio_storage::Store;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use folio_server::app;
use folio_server::config::{ServerConfig, TagSeedFile};
use folio_server::seed;
use folio_server::state::AppState;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  folio-server [config.toml]                                         Start the server");
    eprintln!("  folio-server init-tags <config.toml> [seed.json]                   Create sample tags (built-in list when seed omitted)");
    eprintln!("  folio-server init-models <config.toml>                             Create sample categories and models");
    eprintln!("  folio-server create-user <config.toml> <username> <password> [--staff]  Create a login account");
}

#[tokio::main]
async fn main() -> Result<()> {
    folio_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("folio=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("init-tags") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-tags requires <config.toml> argument")
            })?;
            run_init_tags(config_path, args.get(3).map(String::as_str)).await
        }
        Some("init-models") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-models requires <config.toml> argument")
            })?;
            run_init_models(config_path).await
        }
        Some("create-user") => {
            let (Some(config_path), Some(username), Some(password)) = (args.get(2), args.get(3), args.get(4))
            else {
                print_usage();
                anyhow::bail!("create-user requires <config.toml> <username> <password> arguments");
            };
            let is_staff = args.iter().skip(5).any(|a| a == "--staff");
            run_create_user(config_path, username, password, is_staff).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

async fn open_store(config: &ServerConfig) -> Result<Store> {
    let db_url = config.database.connection_url();
    Ok(Store::new(&db_url, Path::new(&config.database.data_dir)).await?)
}

async fn run_init_tags(config_path: &str, seed_path: Option<&str>) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let store = open_store(&config).await?;

    let seed = match seed_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read seed file '{path}': {e}"))?;
            let file: TagSeedFile = serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse seed file '{path}': {e}"))?;
            Some(file)
        }
        None => None,
    };

    let summary = seed::init_tags(&store, seed).await?;
    tracing::info!(created = summary.created, skipped = summary.skipped, "Tag initialization complete");
    Ok(())
}

async fn run_init_models(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let store = open_store(&config).await?;

    seed::ensure_default_admin(&store, &config.auth).await?;
    let summary = seed::init_sample_models(&store, &config.auth.default_username).await?;
    tracing::info!(created = summary.created, skipped = summary.skipped, "Model initialization complete");
    Ok(())
}

async fn run_create_user(config_path: &str, username: &str, password: &str, is_staff: bool) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let store = open_store(&config).await?;

    if store.get_user_by_username(username).await?.is_some() {
        anyhow::bail!("User '{username}' already exists");
    }
    let hash = folio_storage::auth::hash_password(password)?;
    let user = store.create_user(username, &hash, is_staff).await?;
    tracing::info!(username = %user.username, is_staff = user.is_staff, "User created");
    Ok(())
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let media_root = config.media_root();

    tracing::info!(
        http_port = config.http_port,
        data_dir = %config.database.data_dir,
        db = %config.database.redacted_url(),
        media_root = %media_root.display(),
        inference_enabled = config.inference.enabled,
        "folio-server starting"
    );

    let store = Arc::new(open_store(&config).await?);
    std::fs::create_dir_all(&media_root)
        .map_err(|e| anyhow::anyhow!("Failed to create media root '{}': {e}", media_root.display()))?;

    if let Err(e) = seed::ensure_default_admin(&store, &config.auth).await {
        tracing::error!(error = %e, "Failed to create default admin account");
    }

    let jwt_secret = match &config.auth.jwt_secret {
        Some(secret) => Arc::new(secret.clone()),
        None => {
            tracing::warn!("No jwt_secret configured. A random secret was generated and will change on restart. Set [auth].jwt_secret in config for production use.");
            Arc::new(folio_storage::auth::generate_secret())
        }
    };

    let engine = Arc::new(MockEngine::new(
        config.inference.min_latency_ms,
        config.inference.max_latency_ms,
    ));

    let state = AppState {
        store,
        engine,
        start_time: Utc::now(),
        jwt_secret,
        token_expire_secs: config.auth.token_expire_secs,
        media_root: Arc::new(media_root),
        config: Arc::new(config.clone()),
    };

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    tracing::info!(addr = %http_addr, "HTTP server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("Shutting down gracefully");
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
