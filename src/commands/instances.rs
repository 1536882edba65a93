use anyhow::{Context, Result};
use std::sync::Arc;

use nitter_feed::config::Config;
use nitter_feed::crawler::{DirectoryClient, InstanceDiscovery, NitterFetcher};

/// Run one discovery pass and print the mirrors that passed the probe
pub async fn instances(config: Config) -> Result<()> {
    println!("Discovering Nitter instances");
    println!("============================");
    println!("  Directory: {}", config.instances.directory_url);
    println!("  Probe account: {}", config.instances.probe_account);
    println!();

    let source = Arc::new(NitterFetcher::from_config(&config).context("Failed to create fetcher")?);
    let directory =
        Arc::new(DirectoryClient::from_config(&config).context("Failed to create directory client")?);
    let discovery = InstanceDiscovery::from_config(&config, directory, source);

    let healthy = discovery
        .refresh()
        .await
        .context("Failed to read the instance directory")?;

    let mut healthy: Vec<_> = healthy.into_iter().collect();
    healthy.sort();

    println!("Healthy instances: {}", healthy.len());
    for instance in &healthy {
        println!("  {instance}");
    }

    Ok(())
}
