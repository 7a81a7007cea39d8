//! HTTP API server
//!
//! Exposes the generation pipeline, chat management, the public gallery and
//! the current user's balance as a JSON API. Every response uses the
//! `{ "success": bool, ... }` envelope from [`crate::protocol`].

pub mod auth;
pub mod error;
pub mod routes;

use crate::config::Config;
use crate::error::Result;
use crate::pipeline::GenerationPipeline;
use crate::providers::Providers;
use crate::storage::{ChatStore, SqliteStorage, UserDirectory};

use anyhow::Context;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tracing::Instrument;

/// Shared state injected into every handler
#[derive(Clone)]
pub struct AppState {
    /// Generation pipeline
    pub pipeline: GenerationPipeline,
    /// Chat persistence
    pub chats: Arc<dyn ChatStore>,
    /// Bearer token resolution
    pub users: Arc<dyn UserDirectory>,
}

impl AppState {
    /// Assemble application state
    pub fn new(
        pipeline: GenerationPipeline,
        chats: Arc<dyn ChatStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            pipeline,
            chats,
            users,
        }
    }

    /// Wire everything to one SQLite storage
    pub fn from_storage(storage: Arc<SqliteStorage>, providers: Providers, config: &Config) -> Self {
        let pipeline = GenerationPipeline::new(
            storage.clone(),
            storage.clone(),
            storage.clone(),
            providers,
            config.generation.timeout(),
        );
        Self::new(pipeline, storage.clone(), storage)
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    routes::router()
        .layer(ServiceBuilder::new().layer(middleware::from_fn(trace_requests)))
        .with_state(state)
}

async fn trace_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let span = tracing::info_span!(
        "http_request",
        request_id = %uuid::Uuid::new_v4(),
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        let response = next.run(req).await;
        tracing::debug!(
            status = response.status().as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request finished"
        );
        response
    }
    .instrument(span)
    .await
}

/// Run the API server until Ctrl-C or SIGTERM
///
/// # Errors
///
/// Returns error if providers cannot be built or the address cannot be bound
pub async fn serve(config: &Config, storage: Arc<SqliteStorage>) -> Result<()> {
    let providers = Providers::from_config(&config.providers, config.generation.timeout())?;
    tracing::info!(?providers, db = %storage.db_path().display(), "Starting CreditChat server");

    let app = build_router(AppState::from_storage(storage, providers, config));
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!(addr = %config.server.bind, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl-C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => tracing::warn!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
