// ABOUTME: HTTP route organization for the webhook server
// ABOUTME: Health, sync trigger, and status routes plus the server entry point
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! HTTP routes
//!
//! Each domain module contains route definitions and thin handlers; the
//! sync work itself happens behind [`SyncJob`].

/// Health check route
pub mod health;
/// Sync trigger and status routes
pub mod webhook;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::{AppError, AppResult};

pub use health::HealthRoutes;
pub use webhook::{SyncJob, SyncReport, WebhookContext, WebhookRoutes, AUTH_TOKEN_HEADER};

/// Full router: health plus webhook routes with request tracing
pub fn router(context: WebhookContext) -> Router {
    Router::new()
        .merge(HealthRoutes::routes())
        .merge(WebhookRoutes::routes(context))
        .layer(TraceLayer::new_for_http())
}

/// Serve the webhook until Ctrl-C
///
/// # Errors
///
/// Returns an error when the address cannot be bound or the server fails.
pub async fn serve(bind: &str, context: WebhookContext) -> AppResult<()> {
    let listener = TcpListener::bind(bind).await.map_err(|err| {
        AppError::config_invalid(format!("cannot listen on {bind}")).with_source(err)
    })?;
    info!(address = %bind, "Webhook server listening");

    axum::serve(listener, router(context))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::internal("webhook server failed").with_source(err))?;

    info!("Webhook server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
