// ABOUTME: Serve command for wod-sync
// ABOUTME: Runs the webhook server with the sync pipeline behind its trigger route
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use std::sync::Arc;

use tracing::{info, warn};
use wod_sync::errors::AppResult;
use wod_sync::pipeline::SyncPipeline;
use wod_sync::routes::{self, WebhookContext};

type Result<T> = AppResult<T>;

/// Serve the webhook until Ctrl-C
pub async fn run(pipeline: SyncPipeline, bind: Option<String>, token: Option<String>) -> Result<()> {
    let settings = pipeline.config().webhook.clone();
    let options = pipeline.default_options();
    pipeline.config().validate_for(&options.platforms)?;

    let bind = bind.unwrap_or(settings.bind);
    let token = token.or(settings.token);
    if token.is_none() {
        warn!("Webhook token not set, any caller can trigger a sync");
    }
    info!(platforms = ?options.platforms, days = settings.default_days, "Starting webhook server");

    let context =
        WebhookContext::new(Arc::new(pipeline), token).with_default_days(settings.default_days);
    routes::serve(&bind, context).await
}
