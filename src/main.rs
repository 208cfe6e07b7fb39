use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use clap::Parser;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;
use weblauncher::config::{Cli, Config, default_config_dir, default_config_path};
use weblauncher::db::Database;
use weblauncher::handler::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Cli::parse();

    // With --config, data (the database) lives next to the config file;
    // otherwise both live under ~/.weblauncher/
    let (config_path, data_dir) = match args.config_path {
        Some(path) => {
            let path = PathBuf::from(path);
            let dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            (path, dir)
        }
        None => (default_config_path(), default_config_dir()),
    };

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("failed to create data directory {:?}: {}", data_dir, e);
        std::process::exit(1);
    }

    let cfg = match config_path.to_str() {
        Some(path) if config_path.exists() => Config::new(path).unwrap_or_else(|e| {
            eprintln!("failed to load config file {:?}: {}", config_path, e);
            std::process::exit(1);
        }),
        _ => Config::default(),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.app.log_level));
    tracing_subscriber::fmt().json().with_env_filter(filter).init();
    tracing::info!(config = ?config_path, "weblauncher.svc starting");

    let db = Arc::new(Database::new(&cfg.app, &data_dir).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup database");
        std::process::exit(1);
    }));

    let cors = cors_layer(&cfg.app.frontend_url);
    let app = weblauncher::app(AppState { db: db.clone() }).layer(cors);

    let address = format!("0.0.0.0:{}", cfg.app.get_port());
    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("weblauncher.svc running on {}", &address);
    if let Err(err) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        tracing::error!(error = %err, "server exited with error");
        std::process::exit(1);
    }

    if db.is_replica() {
        tracing::info!("syncing replica before shutdown");
        if let Err(e) = db.sync().await {
            tracing::warn!(error = %e, "final sync failed");
        }
    }
    tracing::info!("weblauncher.svc going off, graceful shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl+c");
        return;
    }
    tracing::info!("ctrl+c signal received, preparing to shutdown");
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    if frontend_url == "*" {
        return cors.allow_origin(Any);
    }
    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!(error = %e, frontend_url, "invalid frontend url, allowing any origin");
            cors.allow_origin(Any)
        }
    }
}
