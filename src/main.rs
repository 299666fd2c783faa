use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info};

use dialect_feed::api;
use dialect_feed::config::Config;
use dialect_feed::engine::RefreshEngine;
use dialect_feed::scheduler::CycleScheduler;
use dialect_feed::session::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dialect_feed=info".parse()?),
        )
        .init();

    info!("Starting dialect feed client");

    // Load configuration from environment
    let config = Arc::new(Config::from_env()?);

    // Stored session token decides whether authoring is available
    let session = SessionStore::new(&config.session_file);
    if session.is_logged_in() {
        info!("Found stored session token, authoring is enabled");
    } else {
        info!("No session token found, running read-only");
    }

    let client = reqwest::Client::new();
    let engine = Arc::new(RefreshEngine::new(client.clone(), Arc::clone(&config))?);

    // Step 1: Load the timeline. A failed load leaves the store empty and
    // the refresh timer disarmed.
    info!("Fetching timeline");
    match api::fetch_timeline(&client, &config).await {
        Ok(posts) => {
            engine.load(posts);
            for post in engine.rendered_feed() {
                info!("[{}] {}", post.id, post.text);
                for reply in &post.replies {
                    info!("  [{}] {}", reply.id, reply.text);
                }
            }
        }
        Err(e) => error!("Failed to load timeline: {}", e),
    }

    // Step 2: Arm the refresh timer while content exists
    let mut scheduler = CycleScheduler::new(
        Arc::clone(&engine),
        Duration::from_secs(config.refresh_interval_secs),
    )
    .await?;
    scheduler.sync().await?;

    // Step 3: Run until interrupted
    info!("Running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    scheduler.shutdown().await?;
    info!("Goodbye");
    Ok(())
}
