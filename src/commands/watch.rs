use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use nitter_feed::config::Config;
use nitter_feed::crawler::{DirectoryClient, InstanceDiscovery, NitterFetcher, PollAggregator};
use nitter_feed::feed::{ChannelSink, FeedSession, SessionSettings};
use nitter_feed::models::FeedConfiguration;

/// Run a feed session in the foreground, printing new posts as JSON lines
pub async fn watch(mut config: Config, accounts: Vec<String>) -> Result<()> {
    if !accounts.is_empty() {
        config.feed.usernames = accounts;
    }
    anyhow::ensure!(
        !config.feed.usernames.is_empty(),
        "No accounts to watch: pass them as arguments or set feed.usernames"
    );

    let source = Arc::new(NitterFetcher::from_config(&config).context("Failed to create fetcher")?);
    let directory =
        Arc::new(DirectoryClient::from_config(&config).context("Failed to create directory client")?);
    let discovery = InstanceDiscovery::from_config(&config, directory, source.clone());
    let aggregator = Arc::new(PollAggregator::from_config(&config, source, discovery));

    let session = FeedSession::new(
        aggregator,
        FeedConfiguration::new(config.feed.usernames.clone()),
        SessionSettings::from_config(&config),
    );

    eprintln!("Watching {} (Ctrl+C to stop)", config.feed.usernames.join(", "));

    let cancel = CancellationToken::new();
    let (mut sink, mut rx) = ChannelSink::channel(64);

    let printer = tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            match serde_json::to_string(&record) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "Failed to encode post"),
            }
        }
    });

    let stopper = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
            }
            cancel.cancel();
        })
    };

    let summary = session.run(&mut sink, cancel).await;
    drop(sink);
    stopper.abort();
    printer.await.context("Printer task failed")?;

    eprintln!(
        "Stopped after {} cycles, {} posts delivered",
        summary.cycles, summary.pushed
    );
    Ok(())
}
