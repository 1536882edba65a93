use anyhow::{Context, Result};
use std::net::SocketAddr;

use nitter_feed::config::Config;
use nitter_feed::metrics;
use nitter_feed::server::FeedServer;

/// Start the feed server
pub async fn serve(mut config: Config, bind: Option<SocketAddr>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }

    if let Err(e) = metrics::init_metrics() {
        tracing::warn!("Metrics initialization failed, continuing without metrics: {}", e);
    }

    let server = FeedServer::new(config.clone()).context("Failed to create feed server")?;

    println!("{}", server.info().display());
    println!("  Initial accounts: {}", config.feed.usernames.join(", "));
    println!();
    println!("API Endpoints:");
    println!("  PUT  /feed/configure - Replace the polled account list");
    println!("  GET  /feed/status    - Current accounts and subscribers");
    println!("  GET  /feed/ws        - WebSocket stream of new posts");
    println!("  GET  /api/health     - Health check");
    println!("  GET  /metrics        - Prometheus metrics endpoint");
    println!();
    println!("Feed server listening on http://{}", config.server.bind_address);
    println!("Press Ctrl+C to stop.\n");

    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await?;

    println!("Feed server stopped.");
    Ok(())
}
