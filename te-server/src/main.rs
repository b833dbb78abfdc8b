//! te-server - TuringEyes survey backend
//!
//! Serves the JSON API behind the survey screens (start, swipe test,
//! demographics, results) and, optionally, the built front-end bundle.
//! `te-server import-images <file>` loads the image catalog.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use te_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig, DEFAULT_PORT};
use te_server::settings::RuntimeSettings;
use te_server::{build_router, catalog, db, AppState};
use tokio::signal;
use tower_http::services::ServeDir;
use tracing::info;

/// Command-line arguments for te-server
#[derive(Parser, Debug)]
#[command(name = "te-server")]
#[command(about = "TuringEyes survey service")]
#[command(version)]
struct Args {
    /// Folder holding turingeyes.db
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: standard locations)
    #[arg(short, long, env = "TURINGEYES_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "TURINGEYES_BIND")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "TURINGEYES_PORT")]
    port: Option<u16>,

    /// Directory of static front-end files served for non-API paths
    #[arg(long, env = "TURINGEYES_STATIC")]
    static_assets: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Load a JSON image catalog into the database
    ImportImages {
        /// JSON array of { id?, source_type, category, image_url, author?, model?, created_at? }
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = match &args.config {
        Some(path) => TomlConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TomlConfig::load_default(),
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("te_server={0},te_common={0},tower_http={0}", toml_config.logging.level).into()
    });
    match &toml_config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    // Build identification first, before any database delay
    info!(
        "Starting TuringEyes survey service (te-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new(&toml_config)
        .with_cli(args.root_folder.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    if let Some(Command::ImportImages { file }) = &args.command {
        let summary = catalog::import_images(&pool, file)
            .await
            .with_context(|| format!("Failed to import {}", file.display()))?;
        info!(
            "✓ Imported {} images ({} human, {} ai)",
            summary.total(),
            summary.human,
            summary.ai
        );
        return Ok(());
    }

    let settings = RuntimeSettings::load(&pool)
        .await
        .context("Failed to load runtime settings")?;
    let state = AppState::new(pool, settings);
    let mut app = build_router(state);

    if let Some(dir) = args.static_assets.or(toml_config.static_assets) {
        info!("Serving static assets from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }

    let bind = args
        .bind
        .or(toml_config.bind_address)
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("te-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
