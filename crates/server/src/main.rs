mod config;
mod http;
mod state;

use adapter::{DetachedMirror, StaticMembership, TracingAuditLog, WebhookClient};
use anyhow::Context;
use dotenvy::dotenv;
use engine::{AuditLogger, Collaborators, Engine, MirrorPublisher, ReactionSurface};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::http::router::build_router;
use crate::state::AppState;
use storage::Db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::new().context("Failed to load configuration")?;

    let db = Db::new(
        &settings.database.url,
        Duration::from_secs(settings.database.acquire_timeout_secs),
    )
    .await?;

    let membership = StaticMembership::from_config(settings.membership.clone())
        .context("Invalid membership table")?;

    let (mirror, audit, surface): (
        Arc<dyn MirrorPublisher>,
        Arc<dyn AuditLogger>,
        Arc<dyn ReactionSurface>,
    ) = match settings.webhook.clone() {
        Some(webhook) => {
            info!("Mirroring suggestions through {}", webhook.base_url);
            let client = Arc::new(WebhookClient::new(webhook)?);
            (client.clone(), client.clone(), client)
        }
        None => {
            info!("No webhook configured, suggestions stay local");
            (
                Arc::new(DetachedMirror),
                Arc::new(TracingAuditLog),
                Arc::new(DetachedMirror),
            )
        }
    };

    let (engine, worker) = Engine::new(
        Arc::new(db),
        Collaborators {
            mirror,
            audit,
            membership: Arc::new(membership),
        },
        settings.engine.clone(),
    );

    let cancel_token = CancellationToken::new();
    let worker_handle = tokio::spawn(worker.run(cancel_token.clone()));

    let state = AppState {
        engine,
        surface,
        admin_token: settings.security.admin_token.clone(),
    };

    let app = build_router(state, &settings.server.cors_origins);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // HTTP is down; now let the worker drain and exit
    cancel_token.cancel();
    if let Err(e) = worker_handle.await {
        error!("Outbound worker crashed: {:?}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
