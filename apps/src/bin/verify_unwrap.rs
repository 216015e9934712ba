use tracing::{debug, error, info};

use anyhow::{bail, Result};
use clap::Parser;
use common::StarkKeySigner;
use tracing_subscriber::EnvFilter;

use unwrap_sign::chain::RpcChainClient;
use unwrap_sign::config::Config;
use unwrap_sign::runner::run_all;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load environment variables if present
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment variables from {:?}", path),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => bail!("failed to load .env file: {}", e),
    }

    let config = Config::parse();
    debug!("Config: {:?}", config);

    let signer = StarkKeySigner::new(config.account_address, config.private_key.expose_secret());
    let client = RpcChainClient::new(config.rpc_url.clone());

    let outcomes = run_all(&config, &signer, &client, &config.token_ids).await;

    let mut failed = Vec::new();
    for outcome in &outcomes {
        match &outcome.result {
            Ok(report) => info!(
                "token {} -> hash {:#x}, signature is {}",
                outcome.token_id, report.message_hash, report.verification
            ),
            Err(e) => {
                error!("token {} -> {e:#}", outcome.token_id);
                failed.push(outcome.token_id.to_string());
            }
        }
    }

    if !failed.is_empty() {
        bail!("runs failed for token ids: {}", failed.join(", "));
    }
    Ok(())
}
