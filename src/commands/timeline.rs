use anyhow::{Context, Result};
use rand::seq::IteratorRandom;
use std::sync::Arc;

use nitter_feed::config::Config;
use nitter_feed::crawler::guard::timed_fetch;
use nitter_feed::crawler::{DirectoryClient, InstanceDiscovery, NitterFetcher};
use nitter_feed::models::InstanceEndpoint;

/// Fetch one timeline page and print its posts as JSON lines
///
/// Without `--instance`, a healthy mirror is discovered first.
pub async fn timeline(config: Config, account: String, instance: Option<String>) -> Result<()> {
    let fetcher = Arc::new(NitterFetcher::from_config(&config).context("Failed to create fetcher")?);

    let instance = match instance {
        Some(host) => InstanceEndpoint::new(nitter_feed::utils::normalize_host(&host)),
        None => {
            let directory = Arc::new(
                DirectoryClient::from_config(&config).context("Failed to create directory client")?,
            );
            let discovery = InstanceDiscovery::from_config(&config, directory, fetcher.clone());
            let healthy = discovery
                .refresh()
                .await
                .context("Failed to read the instance directory")?;
            healthy
                .into_iter()
                .choose(&mut rand::thread_rng())
                .context("No healthy instance available")?
        }
    };

    tracing::info!(account = %account, instance = %instance, "Fetching timeline");

    let records = timed_fetch(fetcher.as_ref(), &account, &instance, config.fetch_timeout())
        .await
        .with_context(|| format!("Failed to fetch {account} from {instance}"))?;

    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }

    Ok(())
}
