// SPDX-License-Identifier: MIT OR Apache-2.0
//! Binary entry point for the gantry daemon.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use gantry_daemon::config::DaemonConfig;
use gantry_daemon::{AppState, build_app, error_pipeline, middleware};
use gantry_health::{HealthCheck, probe_fn};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gantry-daemon", version, about = "Gantry reference daemon")]
struct Args {
    /// Bind address (overrides the config file).
    #[arg(long)]
    bind: Option<String>,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Deployment environment: development, test, or production.
    #[arg(long)]
    env: Option<String>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DaemonConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => DaemonConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(env) = &args.env {
        config.env = env.parse()?;
    }
    // CLI overrides bypass load-time checks, so validate again.
    config.validate().context("validate config")?;

    let filter = if args.debug {
        EnvFilter::new("gantry=debug,gantry_daemon=debug,tower_http=debug")
    } else {
        EnvFilter::new(config.log_level.as_deref().unwrap_or("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let health = Arc::new(HealthCheck::with_options(config.health_options()));
    let state = Arc::new(AppState::new(
        error_pipeline(config.env).into(),
        health.clone(),
    ));

    let started_at = state.started_at;
    health.add_probe(
        "uptime",
        probe_fn(move || {
            let seconds = (Utc::now() - started_at).num_seconds();
            async move { Ok(json!({"seconds": seconds})) }
        }),
    );

    let app = build_app(state).await.context("assemble routes")?;
    let app = if config.cors.allowed_origins.is_empty() {
        app
    } else {
        app.layer(middleware::cors_layer(&config.cors))
    };

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;
    info!(bind = %config.bind, env = %config.env, "gantry-daemon listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
