//! Daily Fixture Digest — one-shot binary that pulls today's calendar for the
//! configured competitions and posts a single summary message to the main
//! webhook. Meant to run from cron each morning, separate from the live
//! poller.
//!
//! Usage:
//!   cargo run --bin digest                 # post to the webhook
//!   cargo run --bin digest -- --dry-run    # print instead of posting

use anyhow::{bail, Result};
use std::time::Duration;
use tracing::info;

use pitchside::config::Config;
use pitchside::digest::daily_digest;
use pitchside::feed::FifaFeed;
use pitchside::notify::{Channel, WebhookNotifier};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let config = match Config::load(std::path::Path::new("pitchside.toml")) {
        Ok(c) => c,
        Err(_) => Config::from_env(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let dry_run = args.iter().any(|a| a == "--dry-run");

    if config.poller.digest_competitions.is_empty() {
        bail!("no digest competitions configured (set poller.digest_competitions)");
    }

    let feed = FifaFeed::new(
        config.feed.base_url.clone(),
        None,
        Duration::from_secs(config.feed.request_timeout_secs),
    )?;

    let text = daily_digest(&feed, &config.poller.digest_competitions).await;

    if dry_run {
        println!("{text}");
        return Ok(());
    }

    if !config.has_webhook() {
        bail!("no webhook configured (set PITCHSIDE_WEBHOOK_URL)");
    }
    let notifier = WebhookNotifier::new(
        config.webhook.url.clone(),
        config.webhook.debug_url.clone(),
        Duration::from_secs(config.feed.request_timeout_secs),
    )?;
    notifier.post(Channel::Main, &text).await?;
    info!("daily digest posted");
    Ok(())
}
