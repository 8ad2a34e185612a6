// ABOUTME: Auth commands for wod-sync
// ABOUTME: Strava authorization-code flow and Garmin session import or credential login
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use tracing::info;
use wod_sync::constants::service_names;
use wod_sync::errors::AppResult;
use wod_sync::pipeline::SyncPipeline;
use wod_sync::providers::garmin_provider::GarminProvider;
use wod_sync::providers::strava_provider::StravaProvider;

type Result<T> = AppResult<T>;

/// Print the authorization URL, or exchange `code` for tokens
pub async fn strava(pipeline: &SyncPipeline, code: Option<String>) -> Result<()> {
    let provider = StravaProvider::new(pipeline.config().strava_config()?, pipeline.token_store());

    let Some(code) = code.filter(|code| !code.trim().is_empty()) else {
        let url = provider.authorization_url(service_names::WOD_SYNC)?;
        println!("\n🔗 Open this URL and approve access:\n\n{url}\n");
        println!("Then copy the `code` parameter from the redirect and run:");
        println!("   wod-sync auth strava --code <code>");
        return Ok(());
    };

    let tokens = provider.exchange_code(code.trim()).await?;
    info!(athlete_id = ?tokens.athlete_id, "Strava authorized");
    println!("✅ Strava authorized, tokens saved to {}", pipeline.token_store().path().display());
    Ok(())
}

/// Import a browser session cookie, or log in with configured credentials
pub async fn garmin(pipeline: &SyncPipeline, session: Option<String>) -> Result<()> {
    let provider = GarminProvider::new(pipeline.config().garmin_config(), pipeline.token_store())?;

    let stored = match session.filter(|cookie| !cookie.trim().is_empty()) {
        Some(cookie) => provider.import_session(&cookie).await?,
        None => provider.login().await?,
    };
    info!(display_name = ?stored.display_name, "Garmin session stored");
    println!(
        "✅ Garmin session saved to {}, valid until {}",
        pipeline.token_store().path().display(),
        stored.expires_at
    );
    Ok(())
}
